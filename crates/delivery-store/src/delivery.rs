use chrono::{DateTime, TimeDelta, Utc};
use common::{DeliveryId, EventId, TrackingNumber};
use serde::{Deserialize, Serialize};

/// How far in the future a new delivery is estimated to arrive.
pub const ESTIMATED_DELIVERY_HORIZON: TimeDelta = TimeDelta::hours(72);

/// Location recorded on the creation event.
pub const CREATION_EVENT_LOCATION: &str = "Warehouse";

/// Description recorded on the creation event.
pub const CREATION_EVENT_DESCRIPTION: &str = "Delivery created and pending processing";

/// Status of a delivery.
///
/// The set of statuses is open: operators may introduce new intermediate
/// statuses without a code change. Only [`DeliveryStatus::DELIVERED`] has
/// special handling, it stamps the actual delivery time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryStatus(String);

impl DeliveryStatus {
    pub const PENDING: &'static str = "PENDING";
    pub const IN_TRANSIT: &'static str = "IN_TRANSIT";
    pub const OUT_FOR_DELIVERY: &'static str = "OUT_FOR_DELIVERY";
    pub const DELIVERED: &'static str = "DELIVERED";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// The status every delivery starts in.
    pub fn pending() -> Self {
        Self::new(Self::PENDING)
    }

    pub fn delivered() -> Self {
        Self::new(Self::DELIVERED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns true for the terminal "delivered" status.
    pub fn is_terminal(&self) -> bool {
        self.0 == Self::DELIVERED
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeliveryStatus {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DeliveryStatus {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Shipping address of a delivery.
///
/// Every field may be empty at the storage layer; completeness is checked
/// by the coordinator before a delivery is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub zip_code: String,
}

impl ShippingAddress {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            country: country.into(),
            zip_code: zip_code.into(),
        }
    }

    /// Returns the name of the first blank field, if any.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("zip_code", &self.zip_code),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// A physical delivery for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,

    /// Reference to the order in the ordering system. Opaque to this crate.
    pub order_id: String,

    pub shipping_address: ShippingAddress,

    /// Courier assigned to the delivery, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<String>,

    pub status: DeliveryStatus,

    pub tracking_number: TrackingNumber,

    pub estimated_delivery_time: DateTime<Utc>,

    /// Set when the delivery reaches [`DeliveryStatus::DELIVERED`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_delivery_time: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Builds a fresh pending delivery together with its creation event.
    ///
    /// Both records carry `now` as their timestamp. Persisting them is the
    /// caller's job and must happen in one unit of work.
    pub fn new_pending(
        order_id: impl Into<String>,
        shipping_address: ShippingAddress,
        now: DateTime<Utc>,
    ) -> (Self, DeliveryEvent) {
        let delivery = Self {
            id: DeliveryId::new(),
            order_id: order_id.into(),
            shipping_address,
            courier_id: None,
            status: DeliveryStatus::pending(),
            tracking_number: TrackingNumber::generate(),
            estimated_delivery_time: now + ESTIMATED_DELIVERY_HORIZON,
            actual_delivery_time: None,
            created_at: now,
            updated_at: now,
        };
        let event = DeliveryEvent {
            id: EventId::new(),
            delivery_id: delivery.id,
            status: delivery.status.clone(),
            location: CREATION_EVENT_LOCATION.to_string(),
            description: CREATION_EVENT_DESCRIPTION.to_string(),
            timestamp: now,
        };
        (delivery, event)
    }
}

/// An entry in a delivery's append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: EventId,
    pub delivery_id: DeliveryId,
    /// Status of the delivery when the event was recorded.
    pub status: DeliveryStatus,
    pub location: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// A status change to apply to an existing delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDelivery {
    pub id: DeliveryId,
    pub status: DeliveryStatus,
    pub location: String,
    pub description: String,
}

impl UpdateDelivery {
    pub fn new(
        id: DeliveryId,
        status: impl Into<DeliveryStatus>,
        location: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            status: status.into(),
            location: location.into(),
            description: description.into(),
        }
    }

    /// Builds the event appended by this update.
    pub fn to_event(&self, timestamp: DateTime<Utc>) -> DeliveryEvent {
        DeliveryEvent {
            id: EventId::new(),
            delivery_id: self.id,
            status: self.status.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            timestamp,
        }
    }
}
