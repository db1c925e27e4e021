//! Durable storage for deliveries.
//!
//! A delivery owns exactly one shipping address and an append-only list of
//! events. The [`DeliveryStore`] trait guarantees that those records are only
//! ever written together inside one transaction, so readers never observe a
//! delivery without its address or creation event.

pub mod config;
pub mod delivery;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{DeliveryId, EventId, TrackingNumber};
pub use config::DatabaseConfig;
pub use delivery::{Delivery, DeliveryEvent, DeliveryStatus, ShippingAddress, UpdateDelivery};
pub use error::{Result, StoreError};
pub use memory::InMemoryDeliveryStore;
pub use postgres::PostgresDeliveryStore;
pub use query::{DeliveryPage, ListQuery, TrackedDelivery};
pub use store::DeliveryStore;
