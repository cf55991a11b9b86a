//! Bus configuration.

use std::time::Duration;

/// Configuration for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Maximum listeners per event name. Subscribing past this limit is
    /// rejected with `BusError::CapacityExceeded`.
    pub max_listeners_per_event: usize,

    /// Default age after which a listener counts as stale for
    /// `cleanup_stale_listeners`. Individual subscriptions can override
    /// this via `SubscribeOptions::stale_after`.
    pub default_stale_after: Duration,
}

impl Default for BusConfig {
    /// Returns a config with:
    /// - `max_listeners_per_event = 100`;
    /// - `default_stale_after = 1h`.
    fn default() -> Self {
        Self {
            max_listeners_per_event: 100,
            default_stale_after: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BusConfig::default();
        assert_eq!(cfg.max_listeners_per_event, 100);
        assert_eq!(cfg.default_stale_after, Duration::from_secs(3600));
    }
}
