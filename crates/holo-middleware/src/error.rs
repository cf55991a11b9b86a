//! Middleware executor errors.

use holo_types::ErrorCode;
use thiserror::Error;

/// Errors surfaced by chain execution.
///
/// Both variants have already been through the error phase by the time
/// the caller sees them — they are the re-raised original failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiddlewareError {
    /// A middleware returned [`Fail`](crate::MiddlewareAction::Fail).
    #[error("middleware '{middleware}' failed: {message}")]
    Failed {
        /// Name of the failing middleware.
        middleware: String,
        /// Failure message.
        message: String,
    },

    /// A middleware's unit of work did not settle within its timeout.
    #[error("middleware '{middleware}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Name of the timed-out middleware.
        middleware: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },
}

impl ErrorCode for MiddlewareError {
    fn code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "MW_FAILED",
            Self::Timeout { .. } => "MW_TIMEOUT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Failed { .. } => false,
            // The next dispatch may be faster.
            Self::Timeout { .. } => true,
        }
    }
}
