use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{CacheBackend, CacheError, CacheKey, Result};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory cache backend for tests and single-process runs.
///
/// Expiry uses tokio's clock, so tests can pause and advance time. The
/// backend can be switched offline to simulate an unreachable cache.
#[derive(Clone, Default)]
pub struct InMemoryCacheBackend {
    entries: Arc<RwLock<HashMap<CacheKey, Entry>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`CacheError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns true if an unexpired entry exists for `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    /// Drops a single entry, simulating eviction.
    pub async fn evict(&self, key: &CacheKey) {
        self.entries.write().await.remove(key);
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("in-memory cache is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        self.check_online()?;
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.check_online()?;
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }
}
