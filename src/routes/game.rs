use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::{FinishGameRequest, GameSummary, ReenterGameRequest, ReentryDetail},
        import::{ImportGameDetail, ImportGameRequest},
    },
    error::AppError,
    routes::bearer_token,
    services::{game_service, import_service},
    state::SharedState,
};

/// Routes handling the game lifecycle and bulk import.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/import", post(import_game))
        .route("/games/{game_id}/finish", post(finish_game))
        .route("/games/{game_id}/reenter", post(reenter_game))
}

/// Close out one side's reporting of a game.
pub async fn finish_game(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<FinishGameRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::finish_game(&state, game_id, payload.team).await?;
    Ok(Json(summary))
}

/// Resume a team's live reporting after a disconnect or a mistaken finish.
pub async fn reenter_game(
    State(state): State<SharedState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<ReenterGameRequest>>,
) -> Result<Json<ReentryDetail>, AppError> {
    let jwt = bearer_token(&headers)?;
    let detail = game_service::reenter_game(&state, game_id, jwt, payload.team_id).await?;
    Ok(Json(detail))
}

/// Ingest a complete, already-played game in one call.
pub async fn import_game(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<ImportGameRequest>>,
) -> Result<Json<ImportGameDetail>, AppError> {
    let jwt = bearer_token(&headers)?;
    let detail = import_service::import_game(&state, jwt, payload).await?;
    Ok(Json(detail))
}
