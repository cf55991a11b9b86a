//! Lifecycle manager configuration.

use std::time::Duration;

/// Eviction policy for the periodic cleanup sweep.
///
/// Only terminal records are eligible: evicting pending or in-flight
/// records would corrupt the dependency graph.
#[derive(Debug, Clone, Copy)]
pub struct SweepPolicy {
    /// How often the background sweeper runs.
    pub interval: Duration,

    /// Terminal records older than this are evicted.
    pub max_age: Duration,

    /// Soft cap on total records; overflow evicts terminal records
    /// oldest-first.
    pub max_records: usize,

    /// Exempt successfully completed records from eviction.
    pub keep_completed: bool,

    /// Exempt failed records from eviction.
    pub keep_failed: bool,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_age: Duration::from_secs(3600),
            max_records: 1000,
            keep_completed: false,
            keep_failed: false,
        }
    }
}

/// Configuration for a [`LifecycleManager`](crate::LifecycleManager).
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Retry budget applied when a submission does not specify one.
    pub default_max_retries: u32,

    /// Processing timeout applied when a submission does not specify
    /// one. `None` means no timeout.
    pub default_timeout: Option<Duration>,

    /// First retry delay; doubles per attempt.
    pub backoff_base: Duration,

    /// Upper bound on the retry delay.
    pub backoff_cap: Duration,

    /// Persisted records older than this are discarded during recovery
    /// instead of reloaded.
    pub recovery_ttl: Duration,

    /// Prefix for persistence keys (`<prefix><uuid>`).
    pub key_prefix: String,

    /// Cleanup sweep policy.
    pub sweep: SweepPolicy,
}

impl Default for LifecycleConfig {
    /// Returns a config with:
    /// - `default_max_retries = 3`, no default timeout;
    /// - backoff 1s base doubling to a 30s cap;
    /// - `recovery_ttl = 24h`, key prefix `"rec-"`.
    fn default() -> Self {
        Self {
            default_max_retries: 3,
            default_timeout: None,
            backoff_base: Duration::from_millis(1000),
            backoff_cap: Duration::from_millis(30_000),
            recovery_ttl: Duration::from_secs(24 * 3600),
            key_prefix: "rec-".to_string(),
            sweep: SweepPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = LifecycleConfig::default();
        assert_eq!(cfg.default_max_retries, 3);
        assert!(cfg.default_timeout.is_none());
        assert_eq!(cfg.backoff_base, Duration::from_millis(1000));
        assert_eq!(cfg.backoff_cap, Duration::from_millis(30_000));
        assert_eq!(cfg.key_prefix, "rec-");
        assert_eq!(cfg.sweep.max_records, 1000);
        assert!(!cfg.sweep.keep_completed);
    }
}
