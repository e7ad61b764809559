use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::point::{
        BackPointRequest, FinishPointRequest, PointDetail, RecordActionRequest, RecordedAction,
        StartPointRequest,
    },
    error::AppError,
    services::point_service,
    state::SharedState,
};

/// Routes driving the live point lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{game_id}/points", post(start_point))
        .route(
            "/games/{game_id}/points/{point_id}/actions",
            post(record_action),
        )
        .route(
            "/games/{game_id}/points/{point_id}/finish",
            post(finish_point),
        )
        .route(
            "/games/{game_id}/points/{point_number}/back",
            post(back_point),
        )
}

/// Open the next point for the reporting side.
pub async fn start_point(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<StartPointRequest>>,
) -> Result<Json<PointDetail>, AppError> {
    let detail = point_service::start_point(&state, game_id, payload).await?;
    Ok(Json(detail))
}

/// Append one action to the reporting side's live buffer.
pub async fn record_action(
    State(state): State<SharedState>,
    Path((game_id, point_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<RecordActionRequest>>,
) -> Result<Json<RecordedAction>, AppError> {
    let recorded = point_service::record_action(&state, game_id, point_id, payload).await?;
    Ok(Json(recorded))
}

/// Declare a point finished for the reporting side.
pub async fn finish_point(
    State(state): State<SharedState>,
    Path((game_id, point_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<FinishPointRequest>>,
) -> Result<Json<PointDetail>, AppError> {
    let detail = point_service::finish_point(&state, game_id, point_id, payload.team).await?;
    Ok(Json(detail))
}

/// Roll the reporting side back onto the preceding point.
pub async fn back_point(
    State(state): State<SharedState>,
    Path((game_id, point_number)): Path<(Uuid, u32)>,
    Valid(Json(payload)): Valid<Json<BackPointRequest>>,
) -> Result<Json<PointDetail>, AppError> {
    let detail = point_service::back_point(&state, game_id, point_number, payload.team).await?;
    Ok(Json(detail))
}
