use journey::respond;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::{json, Value};
use shared::{
    domain::{FoodSpot, RestaurantDirectory},
    protocol::{AgentContext, WebhookRequest, WebhookResponse, SESSION_CONTEXT},
};

/// Plays the agent runtime: feeds each response's output contexts back into
/// the next request.
struct Conversation {
    directory: RestaurantDirectory,
    contexts: Vec<AgentContext>,
    rng: StdRng,
}

impl Conversation {
    fn new() -> Self {
        Self {
            directory: RestaurantDirectory::new(vec![
                FoodSpot {
                    id: "Luigi's".into(),
                    food: vec!["pizza".into(), "coke".into()],
                    cuisine: vec!["italian".into()],
                },
                FoodSpot {
                    id: "Sakura".into(),
                    food: vec!["sushi".into()],
                    cuisine: vec!["japanese".into()],
                },
                FoodSpot {
                    id: "Slice".into(),
                    food: vec!["pizza".into()],
                    cuisine: vec!["american".into()],
                },
            ]),
            contexts: Vec::new(),
            rng: StdRng::seed_from_u64(3),
        }
    }

    fn say(&mut self, action: &str, parameters: Value) -> WebhookResponse {
        let request: WebhookRequest = serde_json::from_value(json!({
            "sessionId": "session-1",
            "result": {
                "action": action,
                "parameters": parameters,
                "contexts": self.contexts,
            }
        }))
        .expect("request");

        let response = respond(request, &self.directory, &mut self.rng).expect("response");
        for context in &response.context_out {
            self.contexts.retain(|existing| existing.name != context.name);
            self.contexts.push(context.clone());
        }
        response
    }

    fn session_data(&self) -> Value {
        self.contexts
            .iter()
            .find(|context| context.name == SESSION_CONTEXT)
            .map(|context| context.parameters["data"].clone())
            .unwrap_or(Value::Null)
    }
}

#[test]
fn full_ordering_journey_from_greeting_to_placed_order() {
    let mut conversation = Conversation::new();

    let greeting = conversation.say("journey.start", json!({}));
    assert!(greeting.speech.starts_with("Welcome to Foodrun"));
    assert!(greeting.data.google.expect_user_response);

    let browse = conversation.say("journey.browse.byFood", json!({ "query-items": ["Pizza"] }));
    assert!(browse.speech.contains("Luigi's & Slice"), "{}", browse.speech);

    let chosen = conversation.say("journey.order.foodSpot", json!({ "food-spot": "Luigi's" }));
    assert!(chosen.speech.contains("from Luigi's?"), "{}", chosen.speech);

    conversation.say("journey.browse.onlyFoodSpot", json!({ "query-items": ["coke"] }));
    assert_eq!(
        conversation.session_data()["order"],
        json!({ "items": ["Pizza", "coke"], "foodSpot": "Luigi's" })
    );

    let confirm = conversation.say("journey.confirmOrder", json!({}));
    assert!(confirm.speech.contains("Pizza & coke"), "{}", confirm.speech);

    let placed = conversation.say("journey.order.ready", json!({}));
    assert!(placed.speech.contains("Pizza & coke"));
    assert!(placed.speech.contains("Luigi's"));
    assert!(placed.data.google.expect_user_response);

    let restart = conversation.say("journey.restart", json!({ "restart": "true", "cuisine": "japanese" }));
    assert!(restart.speech.contains("Sakura"), "{}", restart.speech);
    assert_eq!(conversation.session_data()["order"]["items"], json!([]));
}

#[test]
fn rejected_spot_keeps_journey_on_the_same_node() {
    let mut conversation = Conversation::new();
    conversation.say("journey.start", json!({}));
    conversation.say("journey.browse.byFood", json!({ "query-items": ["sushi"] }));

    let rejected = conversation.say("journey.order.foodSpot", json!({ "food-spot": "Slice" }));
    assert!(rejected.context("bad_spot").is_some());
    assert_eq!(conversation.session_data()["order"]["foodSpot"], Value::Null);

    let accepted = conversation.say("journey.order.foodSpot", json!({ "food-spot": "sakura" }));
    assert!(accepted.speech.contains("from Sakura?"), "{}", accepted.speech);
    assert_eq!(conversation.session_data()["order"]["foodSpot"], json!("Sakura"));
}

#[test]
fn quitting_ends_the_conversation() {
    let mut conversation = Conversation::new();
    conversation.say("journey.start", json!({}));
    let bye = conversation.say("journey.end", json!({}));
    assert!(!bye.data.google.expect_user_response);
}
