//! Engine errors.

use holo_bus::BusError;
use holo_lifecycle::LifecycleError;
use holo_middleware::MiddlewareError;
use holo_types::ErrorCode;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Thin wrappers over the owning layer's errors; `code()` stays in the
/// `ENGINE_` namespace while `is_recoverable()` defers to the inner
/// error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A middleware chain failed during dispatch.
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    /// A lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A bus operation failed.
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Middleware(_) => "ENGINE_MIDDLEWARE",
            Self::Lifecycle(_) => "ENGINE_LIFECYCLE",
            Self::Bus(_) => "ENGINE_BUS",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Middleware(err) => err.is_recoverable(),
            Self::Lifecycle(err) => err.is_recoverable(),
            Self::Bus(err) => err.is_recoverable(),
        }
    }
}
