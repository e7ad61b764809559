use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::stats::FinalizeTask, error::AppError, services::finalize_service, state::SharedState,
};

/// Callback routes invoked by the at-least-once task transport.
pub fn router() -> Router<SharedState> {
    Router::new().route("/tasks/points/finalize", post(finalize_point))
}

/// Migrate one side's live buffer into the store. Safe to redeliver.
pub async fn finalize_point(
    State(state): State<SharedState>,
    Json(task): Json<FinalizeTask>,
) -> Result<StatusCode, AppError> {
    finalize_service::finalize_point(&state, task).await?;
    Ok(StatusCode::NO_CONTENT)
}
