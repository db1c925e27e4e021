//! Identifiers and time helpers shared by the store, cache, and coordinator.

pub mod types;

pub use types::{
    DeliveryId, EventId, ParseIdError, TRACKING_PREFIX, TRACKING_SUFFIX_LEN, TrackingNumber, now,
};
