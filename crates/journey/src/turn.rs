use serde_json::{Map, Value};
use shared::{
    domain::{Intent, Session, UnknownIntent},
    error::ApiError,
    protocol::{
        AgentContext, GoogleResponse, NoInputPrompt, ResponseData, WebhookRequest,
        WebhookResponse, SESSION_CONTEXT, SESSION_CONTEXT_LIFESPAN, SESSION_DATA_PARAM,
    },
};
use thiserror::Error;

use crate::prompts::NO_INPUT;

pub const QUERY_ITEMS_SLOT: &str = "query-items";
pub const CUISINE_SLOT: &str = "cuisine";
pub const FOOD_SPOT_SLOT: &str = "food-spot";
pub const RESTART_SLOT: &str = "restart";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    UnknownIntent(#[from] UnknownIntent),
    #[error("session data is malformed: {0}")]
    MalformedSession(#[source] serde_json::Error),
    #[error("slot '{name}' must be {expected}")]
    InvalidSlot {
        name: &'static str,
        expected: &'static str,
    },
    #[error("failed to encode session data: {0}")]
    EncodeSession(#[source] serde_json::Error),
}

impl From<TurnError> for ApiError {
    fn from(value: TurnError) -> Self {
        match value {
            TurnError::EncodeSession(_) => ApiError::internal(value.to_string()),
            _ => ApiError::validation(value.to_string()),
        }
    }
}

/// Slot arguments extracted by the agent, normalized so blank values are
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slots {
    pub food: Vec<String>,
    pub cuisine: Option<String>,
    pub food_spot: Option<String>,
    pub restart: bool,
}

impl Slots {
    pub fn from_parameters(parameters: &Map<String, Value>) -> Result<Self, TurnError> {
        Ok(Self {
            food: string_list(parameters.get(QUERY_ITEMS_SLOT), QUERY_ITEMS_SLOT)?,
            cuisine: optional_string(parameters.get(CUISINE_SLOT), CUISINE_SLOT)?,
            food_spot: optional_string(parameters.get(FOOD_SPOT_SLOT), FOOD_SPOT_SLOT)?,
            restart: flag(parameters.get(RESTART_SLOT), RESTART_SLOT)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub intent: Intent,
    pub slots: Slots,
    pub session: Session,
    pub contexts: Vec<AgentContext>,
}

impl Turn {
    pub fn new(intent: Intent, slots: Slots, session: Session) -> Self {
        Self {
            intent,
            slots,
            session,
            contexts: Vec::new(),
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<AgentContext>) -> Self {
        self.contexts = contexts;
        self
    }

    /// Validates the agent's request and lifts it into typed turn input.
    pub fn from_request(request: WebhookRequest) -> Result<Self, TurnError> {
        let result = request.result;
        let intent = result.action.parse::<Intent>()?;
        let slots = Slots::from_parameters(&result.parameters)?;
        let session = decode_session(&result.contexts)?;
        let contexts = result
            .contexts
            .into_iter()
            .filter(|context| context.name != SESSION_CONTEXT)
            .collect();
        Ok(Self {
            intent,
            slots,
            session,
            contexts,
        })
    }

    pub fn context(&self, name: &str) -> Option<&AgentContext> {
        self.contexts.iter().find(|context| context.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Keep the conversation open and wait for the user.
    Ask(String),
    /// Say the prompt and end the conversation.
    Tell(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Ask(text) | Reply::Tell(text) => text,
        }
    }

    pub fn expects_user_response(&self) -> bool {
        matches!(self, Reply::Ask(_))
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: Reply,
    pub session: Session,
    pub contexts: Vec<AgentContext>,
}

impl TurnOutcome {
    pub fn context(&self, name: &str) -> Option<&AgentContext> {
        self.contexts.iter().find(|context| context.name == name)
    }

    pub fn into_response(self) -> Result<WebhookResponse, TurnError> {
        let data = serde_json::to_value(&self.session).map_err(TurnError::EncodeSession)?;
        let mut session_params = Map::new();
        session_params.insert(SESSION_DATA_PARAM.to_string(), data);

        let mut context_out = vec![AgentContext::new(
            SESSION_CONTEXT,
            SESSION_CONTEXT_LIFESPAN,
            session_params,
        )];
        context_out.extend(self.contexts);

        let expect_user_response = self.reply.expects_user_response();
        let no_input_prompts = if expect_user_response {
            NO_INPUT
                .iter()
                .map(|prompt| NoInputPrompt {
                    text_to_speech: prompt.to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let speech = match self.reply {
            Reply::Ask(text) | Reply::Tell(text) => text,
        };
        Ok(WebhookResponse {
            display_text: speech.clone(),
            speech,
            context_out,
            data: ResponseData {
                google: GoogleResponse {
                    expect_user_response,
                    is_ssml: false,
                    no_input_prompts,
                },
            },
        })
    }
}

fn decode_session(contexts: &[AgentContext]) -> Result<Session, TurnError> {
    let data = contexts
        .iter()
        .find(|context| context.name == SESSION_CONTEXT)
        .and_then(|context| context.parameters.get(SESSION_DATA_PARAM));

    match data {
        None | Some(Value::Null) => Ok(Session::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(TurnError::MalformedSession)
        }
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn string_list(value: Option<&Value>, name: &'static str) -> Result<Vec<String>, TurnError> {
    let invalid = || TurnError::InvalidSlot {
        name,
        expected: "a string or a list of strings",
    };
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(raw)) => Ok(non_blank(raw).into_iter().collect()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| value.as_str().map(non_blank).ok_or_else(invalid))
            .filter_map(Result::transpose)
            .collect(),
        Some(_) => Err(invalid()),
    }
}

fn optional_string(value: Option<&Value>, name: &'static str) -> Result<Option<String>, TurnError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Ok(non_blank(raw)),
        Some(_) => Err(TurnError::InvalidSlot {
            name,
            expected: "a string",
        }),
    }
}

fn flag(value: Option<&Value>, name: &'static str) -> Result<bool, TurnError> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(set)) => Ok(*set),
        Some(Value::String(raw)) => {
            let raw = raw.trim();
            Ok(!raw.is_empty() && !raw.eq_ignore_ascii_case("false"))
        }
        Some(_) => Err(TurnError::InvalidSlot {
            name,
            expected: "a boolean or a string",
        }),
    }
}

#[cfg(test)]
#[path = "tests/turn_tests.rs"]
mod tests;
