//! Engine configuration.

use holo_bus::BusConfig;
use holo_lifecycle::LifecycleConfig;

/// Configuration for a [`ShellEngine`](crate::ShellEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Event bus settings.
    pub bus: BusConfig,

    /// Lifecycle manager settings.
    pub lifecycle: LifecycleConfig,

    /// Source tag recorded for work the engine itself originates.
    pub source: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            lifecycle: LifecycleConfig::default(),
            source: "shell".to_string(),
        }
    }
}
