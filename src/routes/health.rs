use axum::{Json, Router, extract::State, routing::get};

use crate::{dao::match_store::MatchStore as _, dto::health::HealthResponse, state::SharedState};

/// Return the current health status of the backend and ping the store.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    let (status, storage) = match state.store().await {
        None => ("degraded", "disconnected"),
        Some(store) => match store.health_check().await {
            Ok(()) => ("ok", "up"),
            Err(_) => ("degraded", "down"),
        },
    };
    Json(HealthResponse {
        status: status.into(),
        storage: storage.into(),
    })
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/healthcheck", get(healthcheck))
}
