use std::time::Duration;

use common::{DeliveryId, TrackingNumber};
use delivery_store::{Delivery, DeliveryEvent};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{CacheBackend, CacheKey, Result};

/// Time-to-live applied to every cache entry unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Typed view over a [`CacheBackend`].
///
/// Values are stored as JSON. Every entry is written with the same TTL;
/// nothing is ever explicitly invalidated, writers overwrite instead.
#[derive(Clone)]
pub struct DeliveryCache<B> {
    backend: B,
    ttl: Duration,
}

impl<B: CacheBackend> DeliveryCache<B> {
    pub fn new(backend: B, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Creates a cache with [`DEFAULT_TTL`].
    pub fn with_default_ttl(backend: B) -> Self {
        Self::new(backend, DEFAULT_TTL)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Serializes `value` and stores it under `key`.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.backend.put(key, bytes, self.ttl).await
    }

    /// Loads and deserializes the value under `key`. `Ok(None)` is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn put_delivery(&self, delivery: &Delivery) -> Result<()> {
        self.put(&CacheKey::Delivery(delivery.id), delivery).await
    }

    pub async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        self.get(&CacheKey::Delivery(id)).await
    }

    pub async fn put_tracking(&self, delivery: &Delivery) -> Result<()> {
        self.put(&CacheKey::Tracking(delivery.tracking_number.clone()), delivery)
            .await
    }

    pub async fn get_tracking(&self, tracking_number: &TrackingNumber) -> Result<Option<Delivery>> {
        self.get(&CacheKey::Tracking(tracking_number.clone())).await
    }

    pub async fn put_events(&self, id: DeliveryId, events: &[DeliveryEvent]) -> Result<()> {
        self.put(&CacheKey::Events(id), events).await
    }

    pub async fn get_events(&self, id: DeliveryId) -> Result<Option<Vec<DeliveryEvent>>> {
        self.get(&CacheKey::Events(id)).await
    }
}
