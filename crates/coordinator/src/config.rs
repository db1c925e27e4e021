use std::time::Duration;

/// Time bounds applied by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Upper bound for a single store call. Exceeding it aborts the call and
    /// its transaction.
    pub store_timeout: Duration,
    /// Upper bound for a single cache call. Exceeding it counts as a miss.
    pub cache_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn new(store_timeout: Duration, cache_timeout: Duration) -> Self {
        Self {
            store_timeout,
            cache_timeout,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_millis(250),
        }
    }
}
