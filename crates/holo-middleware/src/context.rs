//! Dispatch context — data passed through the middleware chain.

use crate::MiddlewarePhase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-dispatch context threaded through the middleware chain.
///
/// `Before` middlewares can rewrite `payload` to alter what downstream
/// middlewares observe; `metadata` carries cross-middleware state from
/// the before phase to the after phase of the same dispatch. The two
/// one-shot flags are settable by any middleware:
///
/// - `stop_propagation`: stop the remainder of the current chain;
/// - `prevent_default`: ask the embedding dispatcher to skip the bus
///   fan-out itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchContext {
    /// Phase currently executing.
    pub phase: MiddlewarePhase,

    /// Event name being dispatched.
    pub event: String,

    /// Payload snapshot (JSON form of the event's data).
    pub payload: Value,

    /// Milliseconds since the Unix epoch at context creation.
    pub timestamp_ms: u64,

    /// Who initiated the dispatch (e.g., "shell", "window-manager").
    pub source: String,

    /// Mutable metadata bag, carried before → after.
    pub metadata: HashMap<String, Value>,

    /// One-shot: stop the remainder of the chain.
    pub stop_propagation: bool,

    /// One-shot: suppress the bus dispatch itself.
    pub prevent_default: bool,

    /// The triggering error, set when entering the error phase.
    pub error: Option<String>,
}

impl DispatchContext {
    /// Creates a context for the before phase of a fresh dispatch.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: Value, source: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        Self {
            phase: MiddlewarePhase::Before,
            event: event.into(),
            payload,
            timestamp_ms,
            source: source.into(),
            metadata: HashMap::new(),
            stop_propagation: false,
            prevent_default: false,
            error: None,
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns a copy carrying the triggering error, for the error phase.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the stop-propagation flag.
    pub fn stop_propagation(&mut self) {
        self.stop_propagation = true;
    }

    /// Sets the prevent-default flag.
    pub fn prevent_default(&mut self) {
        self.prevent_default = true;
    }
}
