//! Delivery coordinator orchestrating the store and the cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use common::{DeliveryId, TrackingNumber};
use delivery_cache::{CacheBackend, CacheError, DeliveryCache, KeyFamily};
use delivery_store::{
    Delivery, DeliveryPage, DeliveryStatus, DeliveryStore, ListQuery, ShippingAddress,
    TrackedDelivery, UpdateDelivery,
};
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::{DeliveryError, Result};

/// Page size used when the requested one is unset or out of range.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Serves delivery operations over a store and a best-effort cache.
///
/// The coordinator holds no per-request state and is cheap to clone; clones
/// share the same store and cache handles. Concurrent updates to one
/// delivery are serialized by the store's transaction, not here.
pub struct DeliveryCoordinator<S, B> {
    store: Arc<S>,
    cache: Arc<DeliveryCache<B>>,
    config: CoordinatorConfig,
}

impl<S, B> Clone for DeliveryCoordinator<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            config: self.config,
        }
    }
}

impl<S, B> DeliveryCoordinator<S, B>
where
    S: DeliveryStore,
    B: CacheBackend,
{
    /// Creates a new coordinator.
    pub fn new(store: S, cache: DeliveryCache<B>, config: CoordinatorConfig) -> Self {
        Self {
            store: Arc::new(store),
            cache: Arc::new(cache),
            config,
        }
    }

    pub fn cache(&self) -> &DeliveryCache<B> {
        &self.cache
    }

    /// Creates a pending delivery for `order_id`.
    ///
    /// The order id and every address field must be non-blank. The new
    /// delivery is cached by id and by tracking number.
    #[tracing::instrument(skip(self, shipping_address))]
    pub async fn create(
        &self,
        order_id: &str,
        shipping_address: &ShippingAddress,
    ) -> Result<Delivery> {
        metrics::counter!("delivery_operations_total", "operation" => "create").increment(1);

        if order_id.trim().is_empty() {
            return Err(DeliveryError::InvalidInput("order_id"));
        }
        if let Some(field) = shipping_address.first_missing_field() {
            return Err(DeliveryError::InvalidInput(field));
        }

        let delivery = self
            .store_call(
                "create",
                self.store.create_delivery(order_id, shipping_address),
            )
            .await?;

        self.cache_write(KeyFamily::Delivery, self.cache.put_delivery(&delivery))
            .await;
        self.cache_write(KeyFamily::Tracking, self.cache.put_tracking(&delivery))
            .await;

        info!(
            delivery_id = %delivery.id,
            tracking_number = %delivery.tracking_number,
            "delivery created"
        );
        Ok(delivery)
    }

    /// Looks up a delivery by id.
    ///
    /// A cached value is returned as-is without consulting the store. Ids
    /// that do not parse name no delivery and yield `Ok(None)`.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<Delivery>> {
        metrics::counter!("delivery_operations_total", "operation" => "get").increment(1);

        let Ok(id) = id.parse::<DeliveryId>() else {
            debug!("unparseable delivery id");
            return Ok(None);
        };

        if let Some(delivery) = self
            .cache_read(KeyFamily::Delivery, self.cache.get_delivery(id))
            .await
        {
            return Ok(Some(delivery));
        }

        let delivery = self
            .store_call("get", self.store.get_delivery(id))
            .await?;
        if let Some(delivery) = &delivery {
            self.cache_write(KeyFamily::Delivery, self.cache.put_delivery(delivery))
                .await;
        }
        Ok(delivery)
    }

    /// Sets a delivery's status and appends the matching event.
    ///
    /// Any non-blank status is accepted. `DELIVERED` additionally stamps the
    /// actual delivery time. The by-id and by-tracking cache entries are
    /// overwritten with the stored result.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: &str,
        status: &str,
        location: &str,
        description: &str,
    ) -> Result<Delivery> {
        metrics::counter!("delivery_operations_total", "operation" => "update").increment(1);

        if id.trim().is_empty() {
            return Err(DeliveryError::InvalidInput("id"));
        }
        let status = DeliveryStatus::new(status);
        if status.is_empty() {
            return Err(DeliveryError::InvalidInput("status"));
        }
        let Ok(delivery_id) = id.parse::<DeliveryId>() else {
            return Err(DeliveryError::NotFound(id.to_string()));
        };

        let update = UpdateDelivery::new(delivery_id, status, location, description);
        let delivery = self
            .store_call("update", self.store.update_delivery(&update))
            .await?
            .ok_or_else(|| DeliveryError::NotFound(id.to_string()))?;

        self.cache_write(KeyFamily::Delivery, self.cache.put_delivery(&delivery))
            .await;
        self.cache_write(KeyFamily::Tracking, self.cache.put_tracking(&delivery))
            .await;

        info!(
            delivery_id = %delivery.id,
            status = %delivery.status,
            "delivery updated"
        );
        Ok(delivery)
    }

    /// Lists deliveries newest first. Never cached.
    ///
    /// `page` below 1 becomes 1. `page_size` outside `1..=MAX_PAGE_SIZE`
    /// becomes [`DEFAULT_PAGE_SIZE`]. An empty `order_id` lists all orders.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, order_id: &str, page: i64, page_size: i64) -> Result<DeliveryPage> {
        metrics::counter!("delivery_operations_total", "operation" => "list").increment(1);

        let query = ListQuery::new(order_id, clamp_page(page), clamp_page_size(page_size));
        self.store_call("list", self.store.list_deliveries(&query))
            .await
    }

    /// Looks up a delivery and its event log by tracking number.
    ///
    /// The cached path is used only when both the delivery and its event
    /// list are cached and the newest event matches the delivery's
    /// `updated_at`. Otherwise both come from the store and all three
    /// key families are repopulated.
    #[tracing::instrument(skip(self))]
    pub async fn track(&self, tracking_number: &str) -> Result<Option<TrackedDelivery>> {
        metrics::counter!("delivery_operations_total", "operation" => "track").increment(1);

        let tracking_number = TrackingNumber::from(tracking_number.trim());
        if tracking_number.as_str().is_empty() {
            return Ok(None);
        }

        if let Some(tracked) = self.cached_tracking(&tracking_number).await {
            return Ok(Some(tracked));
        }

        let tracked = self
            .store_call("track", self.store.track_delivery(&tracking_number))
            .await?;
        if let Some(tracked) = &tracked {
            let delivery = &tracked.delivery;
            self.cache_write(KeyFamily::Delivery, self.cache.put_delivery(delivery))
                .await;
            self.cache_write(KeyFamily::Tracking, self.cache.put_tracking(delivery))
                .await;
            self.cache_write(
                KeyFamily::Events,
                self.cache.put_events(delivery.id, &tracked.events),
            )
            .await;
        }
        Ok(tracked)
    }

    async fn cached_tracking(&self, tracking_number: &TrackingNumber) -> Option<TrackedDelivery> {
        let delivery = self
            .cache_read(KeyFamily::Tracking, self.cache.get_tracking(tracking_number))
            .await?;
        let events = self
            .cache_read(KeyFamily::Events, self.cache.get_events(delivery.id))
            .await?;

        let tracked = TrackedDelivery { delivery, events };
        if !tracked.is_in_step() {
            debug!(delivery_id = %tracked.delivery.id, "cached events lag the delivery");
            return None;
        }
        Some(tracked)
    }

    /// Runs a store call under the store timeout.
    ///
    /// On timeout the call's future is dropped, which rolls back any open
    /// transaction.
    async fn store_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = delivery_store::Result<T>>,
    ) -> Result<T> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.config.store_timeout, call).await;
        metrics::histogram!("delivery_store_duration_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(operation, error = %err, "store call failed");
                Err(err.into())
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.store_timeout.as_millis() as u64,
                    "store call timed out"
                );
                Err(DeliveryError::Timeout)
            }
        }
    }

    /// Reads from the cache. Errors and timeouts are treated as misses.
    async fn cache_read<T>(
        &self,
        family: KeyFamily,
        call: impl Future<Output = delivery_cache::Result<Option<T>>>,
    ) -> Option<T> {
        let err = match tokio::time::timeout(self.config.cache_timeout, call).await {
            Ok(Ok(Some(value))) => {
                metrics::counter!("delivery_cache_hits_total", "family" => family.as_str())
                    .increment(1);
                return Some(value);
            }
            Ok(Ok(None)) => {
                metrics::counter!("delivery_cache_misses_total", "family" => family.as_str())
                    .increment(1);
                return None;
            }
            Ok(Err(err)) => err,
            Err(_) => CacheError::Timeout,
        };
        cache_failed(family, "get", &err);
        None
    }

    /// Writes to the cache. Failures are logged and counted only.
    async fn cache_write(
        &self,
        family: KeyFamily,
        call: impl Future<Output = delivery_cache::Result<()>>,
    ) {
        let err = match tokio::time::timeout(self.config.cache_timeout, call).await {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(_) => CacheError::Timeout,
        };
        cache_failed(family, "put", &err);
    }
}

fn cache_failed(family: KeyFamily, op: &'static str, err: &CacheError) {
    metrics::counter!(
        "delivery_cache_errors_total",
        "family" => family.as_str(),
        "op" => op
    )
    .increment(1);
    warn!(family = family.as_str(), op, error = %err, "cache call failed");
}

fn clamp_page(page: i64) -> u32 {
    u32::try_from(page.max(1)).unwrap_or(u32::MAX)
}

fn clamp_page_size(page_size: i64) -> u32 {
    match u32::try_from(page_size) {
        Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
        _ => DEFAULT_PAGE_SIZE,
    }
}
