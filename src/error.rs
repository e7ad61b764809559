use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    cache::CacheError,
    dao::{models::ActionKind, storage::StorageError},
    gateway::GatewayError,
    state::point::InvalidTransition,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Live buffer cache failed.
    #[error("live buffer unavailable")]
    Cache(#[source] CacheError),
    /// An external collaborator failed.
    #[error("collaborator call failed")]
    Collaborator(#[source] GatewayError),
    /// Missing or invalid manager credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested game or point was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation requested against a point state that does not allow it.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Back-point requested on a point pair not in the required states.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// First reporter tried to finish a point whose last buffered action is
    /// not a score sentinel.
    #[error("point `{point_id}` cannot finish: last buffered action is not a score")]
    ScoreRequired {
        /// The point being finished.
        point_id: Uuid,
    },
    /// Second reporter disagrees with the live or persisted record. The
    /// caller must resync before retrying.
    #[error(
        "point `{point_id}` score conflict: reported {reported:?}, recorded {recorded:?}"
    )]
    ConflictingScore {
        /// The point being finished.
        point_id: Uuid,
        /// Last buffered action type of the reporting team.
        reported: ActionKind,
        /// Action type already on record for the other team.
        recorded: ActionKind,
    },
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        match err {
            // A gap in the buffer index range means the record is gone, not
            // that the cache is down.
            CacheError::MissingEntry { .. } => ServiceError::NotFound(err.to_string()),
            other => ServiceError::Cache(other),
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized { message } => ServiceError::Unauthorized(message),
            other => ServiceError::Collaborator(other),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Cache(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Collaborator(source) => {
                AppError::ServiceUnavailable(source.to_string())
            }
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::InvalidTransition(invalid) => AppError::Conflict(invalid.to_string()),
            err @ ServiceError::ScoreRequired { .. } => AppError::BadRequest(err.to_string()),
            err @ ServiceError::ConflictingScore { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
