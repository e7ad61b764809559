//! Business logic orchestrating the store, the live buffer, and the external
//! collaborators.

/// Idempotent buffer-to-store migration triggered by finalize tasks.
pub mod finalize_service;
/// Game lifecycle: finish and reentry.
pub mod game_service;
/// Bulk ingest of already-played games.
pub mod import_service;
/// Live point lifecycle: start, record, finish, back.
pub mod point_service;

use serde::Serialize;

use crate::{error::ServiceError, gateway::GatewayError};

/// Dispatch endpoint receiving consolidated point summaries.
pub const POINT_STATS_ENDPOINT: &str = "stats/points";
/// Dispatch endpoint notified when a settled point is reopened.
pub const POINT_RETRACT_ENDPOINT: &str = "stats/points/retract";
/// Dispatch endpoint receiving game-level summaries.
pub const GAME_STATS_ENDPOINT: &str = "stats/games";
/// Dispatch endpoint redelivering finalize tasks back to this service.
pub const FINALIZE_TASK_ENDPOINT: &str = "tasks/points/finalize";

fn task_payload(endpoint: &str, payload: &impl Serialize) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(payload).map_err(|source| {
        ServiceError::from(GatewayError::Encode {
            endpoint: endpoint.to_owned(),
            source,
        })
    })
}
