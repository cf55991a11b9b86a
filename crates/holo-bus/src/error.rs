//! Bus error types.

use holo_types::ErrorCode;
use thiserror::Error;

/// Error returned by a listener callback.
///
/// Listener failures are contained at the dispatch site: the bus logs
/// them and carries on with the remaining listeners. The type exists so
/// handlers can report failure without panicking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Creates a listener error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Errors from bus operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The per-event listener cap was hit at subscribe time.
    ///
    /// This is a hard cap, not a queue — the caller must remove listeners
    /// (or raise the configured limit) before subscribing again.
    #[error("listener capacity exceeded for '{event}' (limit {limit})")]
    CapacityExceeded {
        /// Event name whose listener list is full.
        event: String,
        /// Configured per-event maximum.
        limit: usize,
    },

    /// `wait_for` timed out before the event fired.
    ///
    /// Distinct from failure: the event simply never happened within the
    /// window. A later wait may succeed.
    #[error("timed out waiting {timeout_ms}ms for '{event}'")]
    WaitTimeout {
        /// Event name that was awaited.
        event: String,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The `wait_for` listener was removed before the event fired.
    ///
    /// Happens when a bulk unsubscribe or a stale-listener sweep reclaims
    /// the waiting listener out from under the caller.
    #[error("wait for '{event}' cancelled: listener removed before the event fired")]
    WaitCancelled {
        /// Event name that was awaited.
        event: String,
    },
}

impl ErrorCode for BusError {
    fn code(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "BUS_CAPACITY_EXCEEDED",
            Self::WaitTimeout { .. } => "BUS_WAIT_TIMEOUT",
            Self::WaitCancelled { .. } => "BUS_WAIT_CANCELLED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // The event may still fire on a later wait.
            Self::WaitTimeout { .. } => true,
            // Retrying without removing listeners won't help.
            Self::CapacityExceeded { .. } => false,
            Self::WaitCancelled { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holo_types::assert_error_codes;

    fn all_variants() -> Vec<BusError> {
        vec![
            BusError::CapacityExceeded {
                event: "x".into(),
                limit: 100,
            },
            BusError::WaitTimeout {
                event: "x".into(),
                timeout_ms: 50,
            },
            BusError::WaitCancelled { event: "x".into() },
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "BUS_");
    }

    #[test]
    fn capacity_display() {
        let err = BusError::CapacityExceeded {
            event: "app:opened".into(),
            limit: 100,
        };
        assert!(err.to_string().contains("app:opened"));
        assert!(err.to_string().contains("100"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn wait_timeout_is_recoverable() {
        let err = BusError::WaitTimeout {
            event: "theme:changed".into(),
            timeout_ms: 50,
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn listener_error_from_str() {
        let err: ListenerError = "boom".into();
        assert_eq!(err.to_string(), "listener failed: boom");
    }
}
