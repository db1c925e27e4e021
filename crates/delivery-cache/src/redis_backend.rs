use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::info;

use crate::{CacheBackend, CacheKey, RedisConfig, Result};

impl redis::ToRedisArgs for CacheKey {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + redis::RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes());
    }
}

/// Redis-backed cache storage.
///
/// Values are written with `SET key value EX ttl`. The connection manager
/// reconnects on its own after a dropped connection; calls made while Redis
/// is down fail fast with a [`crate::CacheError::Redis`] error.
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connects to Redis and verifies the server answers `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url())?;
        let mut conn = ConnectionManager::new(client).await?;

        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(host = %config.host, port = config.port, "connected to delivery cache");

        Ok(Self { conn })
    }

    /// Drops this handle.
    ///
    /// Clones share one multiplexed connection, which is released when the
    /// last clone is dropped. Call this after everything else holding a
    /// clone (such as a coordinator) is gone.
    pub fn close(self) {
        drop(self.conn);
        info!("delivery cache handle released");
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }
}
