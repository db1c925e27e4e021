use thiserror::Error;

/// Errors that can occur when talking to a cache backend.
///
/// Callers treat every variant the same way: log it and fall back to the
/// store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis server returned an error or could not be reached.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend is not reachable.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A cached value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The cache call did not finish in time.
    #[error("Cache operation timed out")]
    Timeout,
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
