use axum::{Router, http::HeaderMap};

use crate::{error::AppError, state::SharedState};

/// Game lifecycle and import endpoints.
pub mod game;
/// Health probe.
pub mod health;
/// Live point endpoints.
pub mod point;
/// Task transport callbacks.
pub mod tasks;

/// Compose all route trees, wiring in shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(game::router())
        .merge(point::router())
        .merge(tasks::router())
        .with_state(state)
}

/// Extract the manager credential from the `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::to_owned)
        .ok_or_else(|| AppError::Unauthorized("authorization header is not a bearer token".into()))
}
