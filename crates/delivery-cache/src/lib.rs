//! Best-effort cache for delivery lookups.
//!
//! The cache is never a source of truth. Entries live in three independent
//! key families (by delivery id, by tracking number, and event logs by
//! delivery id), all with the same fixed time-to-live. A miss is a normal
//! outcome, not an error.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod redis_backend;

pub use backend::CacheBackend;
pub use cache::{DEFAULT_TTL, DeliveryCache};
pub use config::RedisConfig;
pub use error::{CacheError, Result};
pub use key::{CacheKey, KeyFamily};
pub use memory::InMemoryCacheBackend;
pub use redis_backend::RedisCacheBackend;
