use std::time::Duration;

use async_trait::async_trait;

use crate::{CacheKey, Result};

/// Raw byte storage behind the delivery cache.
///
/// Implementations must be thread-safe. Concurrent writes to the same key
/// race freely and the last writer wins.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the stored bytes, or `None` on a miss or an expired entry.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    /// Stores bytes under `key`, replacing any previous value, for `ttl`.
    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<()>;
}
