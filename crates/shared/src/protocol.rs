//! Wire envelope of the agent runtime's fulfillment webhook.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Context the agent runtime uses to carry the session data bag.
pub const SESSION_CONTEXT: &str = "_actions_on_google_";
pub const SESSION_CONTEXT_LIFESPAN: u32 = 100;
pub const SESSION_DATA_PARAM: &str = "data";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub result: WebhookResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_request: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResult {
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub contexts: Vec<AgentContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_query: Option<String>,
}

/// A named, lifespan-bounded bag of parameters owned by the agent runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan: Option<u32>,
}

impl AgentContext {
    pub fn new(name: impl Into<String>, lifespan: u32, parameters: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
            lifespan: Some(lifespan),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub speech: String,
    pub display_text: String,
    #[serde(default)]
    pub context_out: Vec<AgentContext>,
    pub data: ResponseData,
}

impl WebhookResponse {
    pub fn context(&self, name: &str) -> Option<&AgentContext> {
        self.context_out.iter().find(|context| context.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub google: GoogleResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleResponse {
    pub expect_user_response: bool,
    pub is_ssml: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub no_input_prompts: Vec<NoInputPrompt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoInputPrompt {
    pub text_to_speech: String,
}
