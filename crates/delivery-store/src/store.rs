use async_trait::async_trait;

use crate::{
    Delivery, DeliveryEvent, DeliveryId, DeliveryPage, ListQuery, Result, ShippingAddress,
    TrackedDelivery, TrackingNumber, UpdateDelivery,
};

/// Core trait for delivery store implementations.
///
/// A store owns three kinds of records: deliveries, their shipping
/// addresses, and their event logs. Implementations must keep them mutually
/// consistent: every write below is a single unit of work that either commits
/// completely or leaves no trace. Absent records are reported as `Ok(None)`,
/// never as errors. Implementations never retry.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Creates a pending delivery with its address and creation event.
    ///
    /// The delivery id and tracking number are generated by the store. The
    /// order id is stored as given, including the empty string.
    async fn create_delivery(
        &self,
        order_id: &str,
        shipping_address: &ShippingAddress,
    ) -> Result<Delivery>;

    /// Retrieves a delivery and its shipping address.
    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>>;

    /// Applies a status change and appends the matching event.
    ///
    /// The status, the updated timestamp, the appended event, and (for the
    /// terminal status) the actual delivery time all share one transaction
    /// timestamp. If no delivery has the given id, nothing is written and
    /// `Ok(None)` is returned. On success the delivery is re-read after
    /// commit.
    async fn update_delivery(&self, update: &UpdateDelivery) -> Result<Option<Delivery>>;

    /// Lists deliveries newest first, with the total count of matches.
    async fn list_deliveries(&self, query: &ListQuery) -> Result<DeliveryPage>;

    /// Looks up a delivery by tracking number along with its event log.
    async fn track_delivery(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<TrackedDelivery>>;

    /// Retrieves the event log of a delivery, oldest first.
    async fn events_for_delivery(&self, id: DeliveryId) -> Result<Vec<DeliveryEvent>>;
}
