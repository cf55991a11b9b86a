//! Lifecycle manager errors.

use crate::record::Status;
use crate::store::StoreError;
use holo_types::{ErrorCode, RecordId};
use thiserror::Error;

/// Errors from lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No record with the given id.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// A submitted dependency does not name a live record.
    ///
    /// Rejected at submit time; a dependency that never existed would
    /// otherwise withhold the record from the queue forever.
    #[error("unknown dependency: {0}")]
    UnknownDependency(RecordId),

    /// The submitted dependencies would close a cycle.
    ///
    /// A cyclic dependency set can never run; it is rejected fail-fast
    /// instead of stalling silently.
    #[error("dependency cycle detected involving {id}")]
    DependencyCycle {
        /// The record whose submission closed the cycle.
        id: RecordId,
    },

    /// The record cannot start because a dependency is not completed.
    #[error("dependencies unmet for {0}")]
    DependenciesUnmet(RecordId),

    /// The requested transition is not allowed from the current status.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// Record being transitioned.
        id: RecordId,
        /// Current status.
        from: Status,
        /// Requested status.
        to: Status,
    },

    /// A persistence store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for LifecycleError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "LIFECYCLE_NOT_FOUND",
            Self::UnknownDependency(_) => "LIFECYCLE_UNKNOWN_DEPENDENCY",
            Self::DependencyCycle { .. } => "LIFECYCLE_DEPENDENCY_CYCLE",
            Self::DependenciesUnmet(_) => "LIFECYCLE_DEPENDENCIES_UNMET",
            Self::InvalidTransition { .. } => "LIFECYCLE_INVALID_TRANSITION",
            Self::Store(_) => "LIFECYCLE_STORE",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // The dependency may complete later.
            Self::DependenciesUnmet(_) => true,
            Self::Store(err) => err.is_recoverable(),
            Self::NotFound(_)
            | Self::UnknownDependency(_)
            | Self::DependencyCycle { .. }
            | Self::InvalidTransition { .. } => false,
        }
    }
}
