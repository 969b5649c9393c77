use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use journey::respond;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::{
    domain::RestaurantDirectory,
    error::ApiError,
    protocol::{WebhookRequest, WebhookResponse},
};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::app_state::AppState;

/// `POST /`: one agent turn in, one reply out.
pub(crate) async fn webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<ApiError>)> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected webhook envelope");
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(ApiError::validation(rejection.body_text())))
    })?;
    let directory = state.directory();
    let mut rng = StdRng::from_entropy();
    run_turn(request, &directory, &mut rng)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))
}

pub(crate) fn run_turn<R: Rng + ?Sized>(
    request: WebhookRequest,
    directory: &RestaurantDirectory,
    rng: &mut R,
) -> Result<WebhookResponse, ApiError> {
    let span = info_span!(
        "turn",
        turn_id = %Uuid::new_v4(),
        session_id = request.session_id.as_deref().unwrap_or("-"),
        action = %request.result.action,
    );
    let _entered = span.enter();

    match respond(request, directory, rng) {
        Ok(response) => {
            info!(
                expect_user_response = response.data.google.expect_user_response,
                contexts = response.context_out.len(),
                "turn handled"
            );
            Ok(response)
        }
        Err(error) => {
            warn!(%error, "turn rejected");
            Err(error.into())
        }
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
