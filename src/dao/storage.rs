use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure surfaced by whichever backend holds the match record.
///
/// Carries the failing operation in prose so callers can log it without
/// knowing which backend is installed.
#[derive(Debug, Error)]
#[error("match storage unavailable: {operation}")]
pub struct StorageError {
    /// What the store was doing when it failed.
    pub operation: String,
    /// Backend-specific cause.
    #[source]
    pub source: Box<dyn Error + Send + Sync>,
}
