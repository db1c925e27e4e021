use serde::{Deserialize, Serialize};

use crate::{Delivery, DeliveryEvent};

/// Page of deliveries for a listing query.
///
/// Pages are 1-based and offset-based. Results are ordered by creation time,
/// newest first, with the delivery id as tie-break so that pagination is
/// deterministic for deliveries created in the same instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Only deliveries for this order. `None` lists every delivery.
    pub order_id: Option<String>,

    pub page: u32,

    pub page_size: u32,
}

impl ListQuery {
    /// Creates a query. An empty order id means "all orders".
    pub fn new(order_id: impl Into<String>, page: u32, page_size: u32) -> Self {
        let order_id = order_id.into();
        Self {
            order_id: (!order_id.is_empty()).then_some(order_id),
            page,
            page_size,
        }
    }

    /// Query over all deliveries.
    pub fn all(page: u32, page_size: u32) -> Self {
        Self {
            order_id: None,
            page,
            page_size,
        }
    }

    /// Number of rows to skip: `(page - 1) * page_size`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    pub fn matches(&self, delivery: &Delivery) -> bool {
        self.order_id
            .as_deref()
            .is_none_or(|order_id| delivery.order_id == order_id)
    }
}

/// One page of a listing, with the total number of matching deliveries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPage {
    pub deliveries: Vec<Delivery>,

    /// Count of all matching deliveries, independent of pagination.
    pub total: u64,
}

impl DeliveryPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A delivery looked up by tracking number, with its event log in
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedDelivery {
    pub delivery: Delivery,
    pub events: Vec<DeliveryEvent>,
}

impl TrackedDelivery {
    /// Whether the event log is as recent as the delivery.
    ///
    /// Every write appends an event stamped with the delivery's new
    /// `updated_at`, so the newest event must carry that same timestamp.
    pub fn is_in_step(&self) -> bool {
        self.events.last().map(|e| e.timestamp) == Some(self.delivery.updated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShippingAddress;

    #[test]
    fn empty_order_id_lists_everything() {
        assert_eq!(ListQuery::new("", 1, 10).order_id, None);
        assert_eq!(
            ListQuery::new("ORD-1", 1, 10).order_id.as_deref(),
            Some("ORD-1")
        );
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(ListQuery::all(1, 10).offset(), 0);
        assert_eq!(ListQuery::all(3, 25).offset(), 50);
        assert_eq!(ListQuery::all(0, 10).offset(), 0);
    }

    #[test]
    fn tracked_delivery_is_in_step_only_with_the_latest_event() {
        let now = common::now();
        let (mut delivery, created) =
            Delivery::new_pending("ORD-1", ShippingAddress::default(), now);
        let fresh = TrackedDelivery {
            delivery: delivery.clone(),
            events: vec![created.clone()],
        };
        assert!(fresh.is_in_step());

        delivery.updated_at = now + chrono::Duration::seconds(5);
        let stale = TrackedDelivery {
            delivery: delivery.clone(),
            events: vec![created],
        };
        assert!(!stale.is_in_step());

        let empty = TrackedDelivery {
            delivery,
            events: vec![],
        };
        assert!(!empty.is_in_step());
    }
}
