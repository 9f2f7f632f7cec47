//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur when using the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to serialize or parse a snapshot.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A serialized key could not be parsed.
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}
