//! Request-facing delivery operations.
//!
//! [`DeliveryCoordinator`] is the only caller of the delivery store and the
//! delivery cache. It validates input, bounds every call with a timeout, and
//! applies the cache-aside policy:
//!
//! - `create` and `update` write to the store, then overwrite the by-id and
//!   by-tracking cache entries.
//! - `get` reads through the by-id entry.
//! - `track` only uses the cache when both the by-tracking entry and the
//!   event list are present.
//! - `list` always goes to the store.
//!
//! Cache failures are logged and counted, never returned.

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::CoordinatorConfig;
pub use coordinator::{DEFAULT_PAGE_SIZE, DeliveryCoordinator, MAX_PAGE_SIZE};
pub use error::{DeliveryError, ErrorKind, Result};
