use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    Delivery, DeliveryEvent, DeliveryId, DeliveryPage, ListQuery, Result, ShippingAddress,
    StoreError, TrackedDelivery, TrackingNumber, UpdateDelivery, store::DeliveryStore,
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Default)]
struct State {
    deliveries: HashMap<DeliveryId, Delivery>,
    by_tracking: HashMap<TrackingNumber, DeliveryId>,
    // Kept in append order; reads sort stably by timestamp.
    events: HashMap<DeliveryId, Vec<DeliveryEvent>>,
}

/// In-memory delivery store implementation for testing.
///
/// Each write holds the state's write lock for the whole unit of work, which
/// gives the same all-or-nothing visibility as the PostgreSQL transaction.
#[derive(Clone)]
pub struct InMemoryDeliveryStore {
    state: Arc<RwLock<State>>,
    clock: Clock,
}

impl InMemoryDeliveryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            clock: Arc::new(common::now),
        }
    }

    /// Creates a store whose timestamps come from `clock`.
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::default(),
            clock: Arc::new(clock),
        }
    }

    /// Returns the number of stored deliveries.
    pub async fn delivery_count(&self) -> usize {
        self.state.read().await.deliveries.len()
    }

    /// Returns the total number of stored events across all deliveries.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.values().map(Vec::len).sum()
    }

    fn sorted_events(state: &State, id: DeliveryId) -> Vec<DeliveryEvent> {
        let mut events = state.events.get(&id).cloned().unwrap_or_default();
        events.sort_by_key(|e| e.timestamp);
        events
    }
}

impl Default for InMemoryDeliveryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn create_delivery(
        &self,
        order_id: &str,
        shipping_address: &ShippingAddress,
    ) -> Result<Delivery> {
        let (delivery, event) =
            Delivery::new_pending(order_id, shipping_address.clone(), (self.clock)());

        let mut state = self.state.write().await;

        // Unique constraint simulation
        if state.by_tracking.contains_key(&delivery.tracking_number) {
            return Err(StoreError::ConstraintViolation {
                constraint: Some("unique_tracking_number".to_string()),
                message: format!("duplicate tracking number {}", delivery.tracking_number),
            });
        }

        state
            .by_tracking
            .insert(delivery.tracking_number.clone(), delivery.id);
        state.events.insert(delivery.id, vec![event]);
        state.deliveries.insert(delivery.id, delivery.clone());

        Ok(delivery)
    }

    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        Ok(self.state.read().await.deliveries.get(&id).cloned())
    }

    async fn update_delivery(&self, update: &UpdateDelivery) -> Result<Option<Delivery>> {
        let now = (self.clock)();
        let mut state = self.state.write().await;

        let Some(delivery) = state.deliveries.get_mut(&update.id) else {
            return Ok(None);
        };

        delivery.status = update.status.clone();
        delivery.updated_at = now;
        if update.status.is_terminal() {
            delivery.actual_delivery_time = Some(now);
        }
        let updated = delivery.clone();

        state
            .events
            .entry(update.id)
            .or_default()
            .push(update.to_event(now));

        Ok(Some(updated))
    }

    async fn list_deliveries(&self, query: &ListQuery) -> Result<DeliveryPage> {
        let state = self.state.read().await;
        let mut matching: Vec<&Delivery> = state
            .deliveries
            .values()
            .filter(|d| query.matches(d))
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
        let deliveries = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(DeliveryPage { deliveries, total })
    }

    async fn track_delivery(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<TrackedDelivery>> {
        let state = self.state.read().await;
        let Some(id) = state.by_tracking.get(tracking_number).copied() else {
            return Ok(None);
        };
        let delivery = state.deliveries.get(&id).cloned().ok_or_else(|| {
            StoreError::Internal(format!(
                "tracking number {tracking_number} points at missing delivery {id}"
            ))
        })?;
        let events = Self::sorted_events(&state, id);

        Ok(Some(TrackedDelivery { delivery, events }))
    }

    async fn events_for_delivery(&self, id: DeliveryId) -> Result<Vec<DeliveryEvent>> {
        let state = self.state.read().await;
        Ok(Self::sorted_events(&state, id))
    }
}
