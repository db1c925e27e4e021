use common::{DeliveryId, TrackingNumber};

/// The three independent key families of the delivery cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Delivery,
    Tracking,
    Events,
}

impl KeyFamily {
    /// Short label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyFamily::Delivery => "delivery",
            KeyFamily::Tracking => "tracking",
            KeyFamily::Events => "events",
        }
    }
}

impl std::fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key in one of the cache's key families.
///
/// Renders as `delivery:{id}`, `tracking:{number}`, or
/// `delivery_events:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Serialized delivery, by delivery id.
    Delivery(DeliveryId),
    /// Serialized delivery, by tracking number.
    Tracking(TrackingNumber),
    /// Serialized chronological event list, by delivery id.
    Events(DeliveryId),
}

impl CacheKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            CacheKey::Delivery(_) => KeyFamily::Delivery,
            CacheKey::Tracking(_) => KeyFamily::Tracking,
            CacheKey::Events(_) => KeyFamily::Events,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Delivery(id) => write!(f, "delivery:{id}"),
            CacheKey::Tracking(number) => write!(f, "tracking:{number}"),
            CacheKey::Events(id) => write!(f, "delivery_events:{id}"),
        }
    }
}
