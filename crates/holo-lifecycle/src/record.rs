//! Lifecycle records, checkpoints and the backoff formula.

use chrono::{DateTime, Utc};
use holo_types::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Status of a tracked record.
///
/// `completed`, `failed`, `timeout` and `cancelled` are terminal; a
/// record never leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting to run (queued, or withheld behind dependencies).
    Pending,
    /// Currently in flight.
    Processing,
    /// Failed an attempt; a backoff timer will re-queue it.
    Retrying,
    /// Finished successfully.
    Completed,
    /// Exhausted its retry budget.
    Failed,
    /// Processing did not conclude before its timeout.
    Timeout,
    /// Cancelled before reaching another terminal status.
    Cancelled,
}

impl Status {
    /// Returns `true` for terminal statuses.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Timeout | Self::Cancelled
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Fine-grained position within a record's life.
///
/// Orthogonal to [`Status`]: status says *whether* the record is alive,
/// phase says *where* in the dispatch pipeline it currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Record constructed.
    Created,
    /// In the pending queue.
    Queued,
    /// Picked up for processing.
    Started,
    /// Running the before-middleware chain.
    Middleware,
    /// Bus fan-out.
    Routing,
    /// Running the after-middleware chain / handler work.
    Executing,
    /// Terminal bookkeeping done.
    Completed,
    /// Being reclaimed by the cleanup sweep.
    Cleanup,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Middleware => "middleware",
            Self::Routing => "routing",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// An immutable log entry marking a phase transition with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Phase entered.
    pub phase: Phase,
    /// When the transition happened.
    pub at: DateTime<Utc>,
    /// Milliseconds since the previous checkpoint (or record creation).
    pub elapsed_ms: u64,
    /// Whether the transition was a success step.
    pub success: bool,
    /// Error message for failure transitions.
    pub error: Option<String>,
}

/// A tracked unit of work.
///
/// Serde round-trippable: the persisted JSON form is what recovery
/// reloads after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRecord {
    /// Record identity; doubles as the persistence key suffix.
    pub id: RecordId,
    /// Event name this record tracks.
    pub event: String,
    /// Payload snapshot taken at submission.
    pub payload: Value,
    /// Current status.
    pub status: Status,
    /// Current pipeline phase.
    pub phase: Phase,
    /// Queue priority; higher runs earlier.
    pub priority: i32,
    /// Who submitted the work.
    pub source: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// When processing last started.
    pub started_at: Option<DateTime<Utc>>,
    /// When a terminal status was reached.
    pub completed_at: Option<DateTime<Utc>>,
    /// Total wall time from creation to terminal status, in ms.
    pub duration_ms: Option<u64>,
    /// Last error message, retained for inspection.
    pub error: Option<String>,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// Retry budget; exceeding it finalizes the record as `failed`.
    pub max_retries: u32,
    /// Per-attempt processing timeout in ms.
    pub timeout_ms: Option<u64>,
    /// Free-form metadata bag.
    pub metadata: HashMap<String, Value>,
    /// Ordered transition log.
    pub checkpoints: Vec<Checkpoint>,
    /// Records that must complete before this one may run.
    pub depends_on: Vec<RecordId>,
    /// Records unblocked when this one completes.
    pub dependents: Vec<RecordId>,
    /// `true` once every dependency has completed. Kept on the record
    /// so dependency resolution survives eviction of the dependencies
    /// themselves.
    pub resolved: bool,
}

impl LifecycleRecord {
    /// Creates a fresh record in `pending`/`created` with an initial
    /// checkpoint.
    #[must_use]
    pub fn new(id: RecordId, event: impl Into<String>, payload: Value) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id,
            event: event.into(),
            payload,
            status: Status::Pending,
            phase: Phase::Created,
            priority: 0,
            source: "shell".to_string(),
            created_at: now,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error: None,
            retry_count: 0,
            max_retries: 0,
            timeout_ms: None,
            metadata: HashMap::new(),
            checkpoints: Vec::new(),
            depends_on: Vec::new(),
            dependents: Vec::new(),
            resolved: false,
        };
        record.checkpoint(Phase::Created, true, None);
        record
    }

    /// Appends a checkpoint for a phase transition.
    pub fn checkpoint(&mut self, phase: Phase, success: bool, error: Option<String>) {
        let now = Utc::now();
        let since = self
            .checkpoints
            .last()
            .map_or(self.created_at, |c| c.at);
        let elapsed_ms = now
            .signed_duration_since(since)
            .num_milliseconds()
            .max(0) as u64;
        self.checkpoints.push(Checkpoint {
            phase,
            at: now,
            elapsed_ms,
            success,
            error,
        });
    }

    /// Marks the record terminal, stamping completion time and duration.
    pub(crate) fn finalize(&mut self, status: Status) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.duration_ms = Some(
            now.signed_duration_since(self.created_at)
                .num_milliseconds()
                .max(0) as u64,
        );
    }

    /// Returns `true` if the record is in a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Computes the retry backoff delay for a failed attempt.
///
/// `attempt` is 1-based (the first failure is attempt 1). The delay is
/// `base × 2^(attempt−1)`, clamped to `cap`. With the defaults (1s base,
/// 30s cap) the sequence is 1s, 2s, 4s, … 30s.
#[must_use]
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let attempt = attempt.max(1);
    let exp = (attempt - 1).min(31);
    let base_ms = base.as_millis() as u64;
    let cap_ms = cap.as_millis() as u64;
    let delay_ms = base_ms.saturating_mul(1u64 << exp).min(cap_ms);
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> LifecycleRecord {
        LifecycleRecord::new(RecordId::new(), "app:opened", json!({"app_id": "files"}))
    }

    // ── Statuses ─────────────────────────────────────────────

    #[test]
    fn terminal_statuses() {
        assert!(Status::Completed.is_terminal());
        assert!(Status::Failed.is_terminal());
        assert!(Status::Timeout.is_terminal());
        assert!(Status::Cancelled.is_terminal());
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::Processing.is_terminal());
        assert!(!Status::Retrying.is_terminal());
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Retrying.to_string(), "retrying");
        assert_eq!(Phase::Middleware.to_string(), "middleware");
    }

    // ── Records ──────────────────────────────────────────────

    #[test]
    fn new_record_has_creation_checkpoint() {
        let record = record();
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.phase, Phase::Created);
        assert_eq!(record.checkpoints.len(), 1);
        assert_eq!(record.checkpoints[0].phase, Phase::Created);
        assert!(record.checkpoints[0].success);
    }

    #[test]
    fn checkpoints_accumulate_in_order() {
        let mut record = record();
        record.checkpoint(Phase::Queued, true, None);
        record.checkpoint(Phase::Started, true, None);
        record.checkpoint(Phase::Executing, false, Some("boom".into()));

        let phases: Vec<Phase> = record.checkpoints.iter().map(|c| c.phase).collect();
        assert_eq!(
            phases,
            vec![Phase::Created, Phase::Queued, Phase::Started, Phase::Executing]
        );
        assert_eq!(record.checkpoints[3].error.as_deref(), Some("boom"));
        assert!(!record.checkpoints[3].success);
    }

    #[test]
    fn finalize_stamps_completion() {
        let mut record = record();
        record.finalize(Status::Completed);
        assert!(record.is_terminal());
        assert!(record.completed_at.is_some());
        assert!(record.duration_ms.is_some());
    }

    #[test]
    fn serde_roundtrip_preserves_everything() {
        let mut record = record();
        record.depends_on.push(RecordId::new());
        record.metadata.insert("k".into(), json!([1, 2]));
        record.checkpoint(Phase::Queued, true, None);

        let json = serde_json::to_string(&record).unwrap();
        let restored: LifecycleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id, record.id);
        assert_eq!(restored.status, record.status);
        assert_eq!(restored.depends_on, record.depends_on);
        assert_eq!(restored.checkpoints.len(), record.checkpoints.len());
        assert_eq!(restored.metadata, record.metadata);
    }

    // ── Backoff ──────────────────────────────────────────────

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(1000);
        let cap = Duration::from_millis(30_000);
        assert_eq!(backoff_delay(1, base, cap), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2, base, cap), Duration::from_millis(2000));
        assert_eq!(backoff_delay(3, base, cap), Duration::from_millis(4000));
        assert_eq!(backoff_delay(4, base, cap), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_clamps_to_cap() {
        let base = Duration::from_millis(1000);
        let cap = Duration::from_millis(30_000);
        assert_eq!(backoff_delay(6, base, cap), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(100, base, cap), Duration::from_millis(30_000));
    }

    #[test]
    fn backoff_attempt_zero_treated_as_first() {
        let base = Duration::from_millis(500);
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(0, base, cap), Duration::from_millis(500));
    }
}
