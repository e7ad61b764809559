//! Ephemeral cache backing the live action buffer.

/// Live action buffer protocol on top of the cache.
pub mod buffer;
/// DashMap-backed cache used by tests.
pub mod memory;
/// Redis-backed cache.
pub mod redis;

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Error raised by the cache backend or by corrupt buffer contents.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend rejected or failed the operation.
    #[error("cache unavailable: {message}")]
    Unavailable {
        /// What the cache was doing when it failed.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A key the buffer protocol guarantees contiguous is absent.
    #[error("expected cache entry `{key}` is missing")]
    MissingEntry {
        /// The absent key.
        key: String,
    },
    /// A stored value did not parse back.
    #[error("cache entry `{key}` is corrupt: {message}")]
    Corrupt {
        /// The offending key.
        key: String,
        /// Parse failure detail.
        message: String,
    },
}

impl CacheError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        CacheError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over the string key/value cache holding live buffers.
///
/// Every method is a single request to the backend; failures propagate
/// unrecovered to the caller.
pub trait LiveCache: Send + Sync {
    /// Read a key; absent keys yield `None`.
    fn get(&self, key: String) -> BoxFuture<'static, CacheResult<Option<String>>>;
    /// Write a key, overwriting any previous value.
    fn set(&self, key: String, value: String) -> BoxFuture<'static, CacheResult<()>>;
    /// Delete a key. Deleting an absent key is a no-op.
    fn del(&self, key: String) -> BoxFuture<'static, CacheResult<()>>;
}
