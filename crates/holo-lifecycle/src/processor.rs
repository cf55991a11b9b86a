//! Processor trait for auto-driven records.

use crate::manager::PhaseRecorder;
use crate::record::LifecycleRecord;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by an [`EventProcessor`].
///
/// Carries a message only; the manager turns it into a `fail_event`,
/// which is where retry/backoff policy lives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProcessError(pub String);

impl From<&str> for ProcessError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for ProcessError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Processes one runnable record.
///
/// Installed into a [`LifecycleManager`](crate::LifecycleManager) to
/// auto-drive the pending queue: the manager handles status
/// transitions, timeouts and retries, the processor does the actual
/// work. The engine's processor runs before-middleware → bus dispatch →
/// after-middleware; tests install simpler ones.
///
/// The `phases` handle lets the processor mark fine-grained pipeline
/// phases (`middleware`, `routing`, `executing`) on the record while it
/// is in flight — purely observational, never required.
#[async_trait::async_trait]
pub trait EventProcessor: Send + Sync {
    /// Processes the record, returning a result value stored in the
    /// record's metadata on completion.
    ///
    /// # Errors
    ///
    /// A returned [`ProcessError`] counts as one failed attempt and
    /// goes through the manager's retry/backoff machinery.
    async fn process(
        &self,
        record: LifecycleRecord,
        phases: PhaseRecorder,
    ) -> Result<Value, ProcessError>;
}
