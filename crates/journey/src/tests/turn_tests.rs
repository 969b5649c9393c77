use super::*;
use serde_json::json;

fn request(value: Value) -> WebhookRequest {
    serde_json::from_value(value).expect("request envelope")
}

#[test]
fn decodes_intent_slots_and_session_bag() {
    let turn = Turn::from_request(request(json!({
        "sessionId": "abc",
        "result": {
            "action": "journey.browse.byFood",
            "parameters": { "query-items": ["Pizza", " "], "cuisine": "", "food-spot": "X" },
            "contexts": [
                {
                    "name": "_actions_on_google_",
                    "lifespan": 99,
                    "parameters": { "data": { "order": { "items": ["coke"], "foodSpot": null } } }
                },
                { "name": "browsing", "lifespan": 4, "parameters": {} }
            ]
        }
    })))
    .expect("turn");

    assert_eq!(turn.intent, Intent::BrowseByFood);
    assert_eq!(turn.slots.food, vec!["Pizza".to_string()]);
    assert_eq!(turn.slots.cuisine, None);
    assert_eq!(turn.slots.food_spot.as_deref(), Some("X"));
    assert!(!turn.slots.restart);
    assert_eq!(turn.session.order.items, vec!["coke".to_string()]);
    assert!(turn.context(SESSION_CONTEXT).is_none());
    assert!(turn.context("browsing").is_some());
}

#[test]
fn single_string_query_items_become_one_item_list() {
    let mut params = Map::new();
    params.insert(QUERY_ITEMS_SLOT.into(), json!("sushi"));
    params.insert(RESTART_SLOT.into(), json!("restart"));
    let slots = Slots::from_parameters(&params).expect("slots");
    assert_eq!(slots.food, vec!["sushi".to_string()]);
    assert!(slots.restart);
}

#[test]
fn rejects_unknown_action() {
    let err = Turn::from_request(request(json!({
        "result": { "action": "input.welcome" }
    })))
    .expect_err("should fail");
    assert!(matches!(err, TurnError::UnknownIntent(_)));

    let api: ApiError = err.into();
    assert!(matches!(api.code, shared::error::ErrorCode::Validation));
}

#[test]
fn rejects_malformed_session_bag() {
    let err = Turn::from_request(request(json!({
        "result": {
            "action": "journey.start",
            "contexts": [
                { "name": "_actions_on_google_", "parameters": { "data": { "order": { "items": "pizza" } } } }
            ]
        }
    })))
    .expect_err("should fail");
    assert!(matches!(err, TurnError::MalformedSession(_)));
}

#[test]
fn rejects_non_string_slot() {
    let err = Turn::from_request(request(json!({
        "result": { "action": "journey.order.foodSpot", "parameters": { "food-spot": 7 } }
    })))
    .expect_err("should fail");
    assert!(matches!(
        err,
        TurnError::InvalidSlot {
            name: FOOD_SPOT_SLOT,
            ..
        }
    ));
}

#[test]
fn ask_response_carries_session_context_and_no_input_prompts() {
    let mut session = Session::default();
    session.order.food_spot = Some("X".into());
    let outcome = TurnOutcome {
        reply: Reply::Ask("Anything else from X?".into()),
        session,
        contexts: vec![AgentContext::new("bad_spot", 2, Map::new())],
    };

    let response = outcome.into_response().expect("response");
    assert_eq!(response.speech, "Anything else from X?");
    assert_eq!(response.display_text, response.speech);
    assert!(response.data.google.expect_user_response);
    assert_eq!(response.data.google.no_input_prompts.len(), NO_INPUT.len());

    let session_context = response.context(SESSION_CONTEXT).expect("session context");
    assert_eq!(session_context.lifespan, Some(SESSION_CONTEXT_LIFESPAN));
    assert_eq!(
        session_context.parameters[SESSION_DATA_PARAM]["order"]["foodSpot"],
        json!("X")
    );
    assert!(response.context("bad_spot").is_some());
}

#[test]
fn tell_response_ends_conversation() {
    let outcome = TurnOutcome {
        reply: Reply::Tell("Ok, bye".into()),
        session: Session::default(),
        contexts: Vec::new(),
    };
    let response = outcome.into_response().expect("response");
    assert!(!response.data.google.expect_user_response);
    assert!(response.data.google.no_input_prompts.is_empty());

    let wire = serde_json::to_value(&response).expect("json");
    assert!(wire["data"]["google"].get("no_input_prompts").is_none());
    assert_eq!(wire["displayText"], json!("Ok, bye"));
}
