use serde::Serialize;

/// Health status of the backend and its storage connection.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status, `ok` or `degraded`.
    pub status: String,
    /// Storage connectivity, `up`, `down`, or `disconnected`.
    pub storage: String,
}
