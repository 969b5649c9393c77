//! Per-turn ordering journey: decodes the agent's webhook request, runs the
//! intent against the restaurant directory and encodes the reply.

pub mod controller;
pub mod format;
pub mod prompts;
pub mod turn;

pub use controller::handle_turn;
pub use turn::{Reply, Slots, Turn, TurnError, TurnOutcome};

use rand::Rng;
use shared::{
    domain::RestaurantDirectory,
    protocol::{WebhookRequest, WebhookResponse},
};

/// Decode, handle and encode a single webhook request.
pub fn respond<R: Rng + ?Sized>(
    request: WebhookRequest,
    directory: &RestaurantDirectory,
    rng: &mut R,
) -> Result<WebhookResponse, TurnError> {
    let turn = Turn::from_request(request)?;
    handle_turn(turn, directory, rng).into_response()
}
