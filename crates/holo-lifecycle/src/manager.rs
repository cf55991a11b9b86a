//! The lifecycle manager.
//!
//! Owns the record map and pending queue; every public operation leaves
//! both consistent after each synchronous step, because timer callbacks
//! (timeout watchdogs, backoff re-queues, the sweeper) interleave with
//! submissions at await points.

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::processor::EventProcessor;
use crate::record::{backoff_delay, LifecycleRecord, Phase, Status};
use crate::store::LifecycleStore;
use chrono::Utc;
use holo_types::RecordId;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Notify};

type TerminalHook = Box<dyn Fn(&LifecycleRecord) + Send + Sync>;

/// Options for [`LifecycleManager::submit`].
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Queue priority; higher runs earlier. Default 0.
    pub priority: i32,

    /// Per-attempt processing timeout. Falls back to the config default.
    pub timeout: Option<Duration>,

    /// Retry budget. Falls back to the config default.
    pub max_retries: Option<u32>,

    /// Records that must reach `completed` before this one may run.
    pub depends_on: Vec<RecordId>,

    /// Who submitted the work. Default "shell".
    pub source: String,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            timeout: None,
            max_retries: None,
            depends_on: Vec::new(),
            source: "shell".to_string(),
        }
    }
}

impl SubmitOptions {
    /// Sets the queue priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Adds dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = RecordId>) -> Self {
        self.depends_on.extend(deps);
        self
    }

    /// Sets the source tag.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Outcome of a recovery pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryReport {
    /// Non-terminal records reloaded into the manager.
    pub restored: usize,
    /// Records found `processing`/`retrying` and demoted to `pending`.
    pub demoted: usize,
    /// Records discarded as terminal or older than the recovery TTL.
    pub discarded: usize,
    /// Records dropped as malformed or cyclic.
    pub dropped: usize,
}

/// Outcome of a cleanup sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    /// Records evicted (and removed from the store).
    pub evicted: usize,
    /// Records remaining after the sweep.
    pub remaining: usize,
}

/// Marks fine-grained pipeline phases on an in-flight record.
///
/// Handed to [`EventProcessor::process`]; holds a weak reference so a
/// recorder outliving its manager degrades to a no-op instead of
/// keeping the state alive.
pub struct PhaseRecorder {
    inner: Weak<ManagerInner>,
    id: RecordId,
}

impl PhaseRecorder {
    /// Marks the record as having entered `phase`, with a checkpoint.
    ///
    /// No-op unless the record is currently `processing`.
    pub async fn mark(&self, phase: Phase) {
        if let Some(inner) = self.inner.upgrade() {
            LifecycleManager { inner }.mark_phase(self.id, phase).await;
        }
    }
}

struct ManagerState {
    records: HashMap<RecordId, LifecycleRecord>,
    /// Runnable record ids, priority-descending (stable for ties).
    pending: Vec<RecordId>,
}

struct ManagerInner {
    config: LifecycleConfig,
    state: Mutex<ManagerState>,
    store: Option<Arc<dyn LifecycleStore>>,
    processor: RwLock<Option<Arc<dyn EventProcessor>>>,
    on_terminal: RwLock<Option<TerminalHook>>,
    runnable: Notify,
    shutdown: watch::Sender<bool>,
}

/// Tracks units of work through the lifecycle state machine.
///
/// Cheap to clone (internally an `Arc`). See the crate docs for the
/// state machine; the short version:
///
/// - [`submit`](Self::submit) creates a record, withheld from the queue
///   while dependencies are unmet
/// - [`start_processing`](Self::start_processing) /
///   [`complete_event`](Self::complete_event) /
///   [`fail_event`](Self::fail_event) /
///   [`cancel_event`](Self::cancel_event) drive transitions manually
/// - with an [`EventProcessor`] installed, the manager drives runnable
///   records itself
///
/// Every status/phase mutation is persisted (best-effort) to the
/// configured store.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<ManagerInner>,
}

impl LifecycleManager {
    /// Creates a manager without persistence.
    #[must_use]
    pub fn new(config: LifecycleConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a manager persisting to the given store.
    #[must_use]
    pub fn with_store(config: LifecycleConfig, store: Arc<dyn LifecycleStore>) -> Self {
        Self::build(config, Some(store))
    }

    fn build(config: LifecycleConfig, store: Option<Arc<dyn LifecycleStore>>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ManagerInner {
                config,
                state: Mutex::new(ManagerState {
                    records: HashMap::new(),
                    pending: Vec::new(),
                }),
                store,
                processor: RwLock::new(None),
                on_terminal: RwLock::new(None),
                runnable: Notify::new(),
                shutdown,
            }),
        }
    }

    /// Installs the processor used by the drive loop.
    pub fn set_processor(&self, processor: Arc<dyn EventProcessor>) {
        *self.inner.processor.write() = Some(processor);
    }

    /// Installs an observer invoked on every terminal transition.
    ///
    /// The engine uses this to re-emit an observable error event when a
    /// tracked record fails or times out.
    pub fn set_on_terminal(&self, hook: impl Fn(&LifecycleRecord) + Send + Sync + 'static) {
        *self.inner.on_terminal.write() = Some(Box::new(hook));
    }

    // ── Submission ───────────────────────────────────────────

    /// Creates a tracked record.
    ///
    /// If `depends_on` is non-empty the record is withheld from the
    /// pending queue until every dependency reaches `completed`;
    /// dependency edges are recorded bidirectionally.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::UnknownDependency`] if a dependency does not
    ///   name a live record;
    /// - [`LifecycleError::DependencyCycle`] if the submission would
    ///   close a dependency cycle.
    pub async fn submit(
        &self,
        event: impl Into<String>,
        payload: Value,
        opts: SubmitOptions,
    ) -> Result<RecordId, LifecycleError> {
        let id = RecordId::new();
        let snapshot = {
            let mut state = self.inner.state.lock();

            let mut depends_on: Vec<RecordId> = Vec::new();
            for dep in opts.depends_on {
                if !depends_on.contains(&dep) {
                    depends_on.push(dep);
                }
            }
            for dep in &depends_on {
                if !state.records.contains_key(dep) {
                    return Err(LifecycleError::UnknownDependency(*dep));
                }
            }
            if depends_on.contains(&id)
                || depends_on
                    .iter()
                    .any(|dep| has_path(&state.records, *dep, id))
            {
                return Err(LifecycleError::DependencyCycle { id });
            }

            let mut record = LifecycleRecord::new(id, event, payload);
            record.priority = opts.priority;
            record.source = opts.source;
            record.max_retries = opts
                .max_retries
                .unwrap_or(self.inner.config.default_max_retries);
            record.timeout_ms = opts
                .timeout
                .or(self.inner.config.default_timeout)
                .map(|d| d.as_millis() as u64);
            record.depends_on = depends_on.clone();

            let runnable_now = depends_on.iter().all(|dep| {
                state
                    .records
                    .get(dep)
                    .is_some_and(|r| r.status == Status::Completed)
            });
            for dep in &depends_on {
                if let Some(d) = state.records.get_mut(dep) {
                    d.dependents.push(id);
                }
            }
            if runnable_now {
                record.resolved = true;
                record.phase = Phase::Queued;
                record.checkpoint(Phase::Queued, true, None);
            }

            let snapshot = record.clone();
            state.records.insert(id, record);
            if runnable_now {
                Self::enqueue(&mut state, id);
            }
            snapshot
        };

        self.persist(&snapshot).await;
        self.inner.runnable.notify_one();
        Ok(id)
    }

    /// Returns `true` iff every dependency of `id` is `completed`.
    #[must_use]
    pub fn can_run(&self, id: RecordId) -> bool {
        let state = self.inner.state.lock();
        state.records.get(&id).is_some_and(|record| {
            !record.status.is_terminal()
                && (record.resolved
                    || record.depends_on.iter().all(|dep| {
                        state
                            .records
                            .get(dep)
                            .is_some_and(|r| r.status == Status::Completed)
                    }))
        })
    }

    // ── Transitions ──────────────────────────────────────────

    /// Dequeues a record and marks it `processing`, arming the timeout
    /// watchdog if the record has one.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] for unknown ids;
    /// - [`LifecycleError::InvalidTransition`] unless the record is
    ///   `pending`;
    /// - [`LifecycleError::DependenciesUnmet`] while dependencies are
    ///   outstanding.
    pub async fn start_processing(&self, id: RecordId) -> Result<(), LifecycleError> {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get(&id) else {
                return Err(LifecycleError::NotFound(id));
            };
            if record.status != Status::Pending {
                return Err(LifecycleError::InvalidTransition {
                    id,
                    from: record.status,
                    to: Status::Processing,
                });
            }
            let unmet = !record.resolved
                && !record.depends_on.iter().all(|dep| {
                    state
                        .records
                        .get(dep)
                        .is_some_and(|r| r.status == Status::Completed)
                });
            if unmet {
                return Err(LifecycleError::DependenciesUnmet(id));
            }

            state.pending.retain(|p| *p != id);
            let record = state.records.get_mut(&id).expect("checked above");
            record.status = Status::Processing;
            record.phase = Phase::Started;
            record.started_at = Some(Utc::now());
            record.checkpoint(Phase::Started, true, None);
            record.clone()
        };

        self.persist(&snapshot).await;

        if let Some(timeout_ms) = snapshot.timeout_ms {
            let manager = self.clone();
            let attempt = snapshot.retry_count;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                manager.force_timeout(id, attempt, timeout_ms).await;
            });
        }
        Ok(())
    }

    /// Marks a `processing` record `completed` and unblocks dependents.
    ///
    /// Dependents whose dependencies are now all completed are pushed
    /// onto the pending queue within the same synchronous step.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless the record is
    /// `processing`.
    pub async fn complete_event(
        &self,
        id: RecordId,
        result: Option<Value>,
    ) -> Result<(), LifecycleError> {
        let (snapshot, unblocked) = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get_mut(&id) else {
                return Err(LifecycleError::NotFound(id));
            };
            if record.status != Status::Processing {
                return Err(LifecycleError::InvalidTransition {
                    id,
                    from: record.status,
                    to: Status::Completed,
                });
            }
            record.finalize(Status::Completed);
            record.phase = Phase::Completed;
            if let Some(result) = result {
                record.metadata.insert("result".to_string(), result);
            }
            record.checkpoint(Phase::Completed, true, None);
            let dependents = record.dependents.clone();
            let snapshot = record.clone();

            let ready: Vec<RecordId> = dependents
                .into_iter()
                .filter(|dep_id| {
                    state.records.get(dep_id).is_some_and(|d| {
                        d.status == Status::Pending
                            && !d.resolved
                            && d.depends_on.iter().all(|x| {
                                state
                                    .records
                                    .get(x)
                                    .is_some_and(|r| r.status == Status::Completed)
                            })
                    })
                })
                .collect();

            let mut unblocked = Vec::new();
            for dep_id in ready {
                if let Some(d) = state.records.get_mut(&dep_id) {
                    d.resolved = true;
                    d.phase = Phase::Queued;
                    d.checkpoint(Phase::Queued, true, None);
                    unblocked.push(d.clone());
                }
                Self::enqueue(&mut state, dep_id);
            }
            (snapshot, unblocked)
        };

        self.persist(&snapshot).await;
        for record in &unblocked {
            self.persist(record).await;
        }
        if !unblocked.is_empty() {
            self.inner.runnable.notify_one();
        }
        self.fire_terminal(&snapshot);
        Ok(())
    }

    /// Records a failed attempt.
    ///
    /// Within the retry budget the record becomes `retrying` and is
    /// re-queued after an exponential backoff delay; past the budget it
    /// finalizes as `failed` with the last error retained.
    ///
    /// Returns the resulting status (`Retrying` or `Failed`).
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] if the record is already
    /// terminal.
    pub async fn fail_event(
        &self,
        id: RecordId,
        error: impl Into<String>,
    ) -> Result<Status, LifecycleError> {
        let error = error.into();
        let (snapshot, retry_delay) = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get_mut(&id) else {
                return Err(LifecycleError::NotFound(id));
            };
            if record.status.is_terminal() {
                return Err(LifecycleError::InvalidTransition {
                    id,
                    from: record.status,
                    to: Status::Failed,
                });
            }

            record.retry_count += 1;
            record.error = Some(error.clone());
            let phase = record.phase;
            if record.retry_count <= record.max_retries {
                record.status = Status::Retrying;
                record.checkpoint(phase, false, Some(error));
                let delay = backoff_delay(
                    record.retry_count,
                    self.inner.config.backoff_base,
                    self.inner.config.backoff_cap,
                );
                (record.clone(), Some(delay))
            } else {
                record.finalize(Status::Failed);
                record.checkpoint(phase, false, Some(error));
                (record.clone(), None)
            }
        };

        self.persist(&snapshot).await;
        match retry_delay {
            Some(delay) => {
                tracing::debug!(
                    record = %id,
                    attempt = snapshot.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "retry scheduled"
                );
                let manager = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    manager.requeue(id).await;
                });
            }
            None => {
                tracing::warn!(
                    record = %id,
                    event = %snapshot.event,
                    attempts = snapshot.retry_count,
                    "retries exhausted"
                );
                self.fire_terminal(&snapshot);
            }
        }
        Ok(snapshot.status)
    }

    /// Cancels a record before it reaches a terminal status.
    ///
    /// Cooperative: an in-flight processor is not aborted; its eventual
    /// completion or failure becomes a no-op against the terminal
    /// record.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] if already terminal.
    pub async fn cancel_event(
        &self,
        id: RecordId,
        reason: Option<String>,
    ) -> Result<(), LifecycleError> {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get(&id) else {
                return Err(LifecycleError::NotFound(id));
            };
            if record.status.is_terminal() {
                return Err(LifecycleError::InvalidTransition {
                    id,
                    from: record.status,
                    to: Status::Cancelled,
                });
            }
            state.pending.retain(|p| *p != id);
            let record = state.records.get_mut(&id).expect("checked above");
            let phase = record.phase;
            record.finalize(Status::Cancelled);
            record.error = reason.clone();
            record.checkpoint(phase, false, reason);
            record.clone()
        };

        self.persist(&snapshot).await;
        self.fire_terminal(&snapshot);
        Ok(())
    }

    /// Marks a fine-grained phase on a `processing` record.
    pub async fn mark_phase(&self, id: RecordId, phase: Phase) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get_mut(&id) else {
                return;
            };
            if record.status != Status::Processing {
                return;
            }
            record.phase = phase;
            record.checkpoint(phase, true, None);
            record.clone()
        };
        self.persist(&snapshot).await;
    }

    // ── Introspection ────────────────────────────────────────

    /// Returns a snapshot of a record.
    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<LifecycleRecord> {
        self.inner.state.lock().records.get(&id).cloned()
    }

    /// Returns a record's current status.
    #[must_use]
    pub fn status_of(&self, id: RecordId) -> Option<Status> {
        self.inner.state.lock().records.get(&id).map(|r| r.status)
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().records.len()
    }

    /// Returns `true` if no records are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records in the pending queue.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    // ── Auto-drive ───────────────────────────────────────────

    /// Processes every currently runnable record through the installed
    /// processor. No-op without one.
    pub async fn drive_pending(&self) {
        let Some(processor) = self.inner.processor.read().clone() else {
            return;
        };
        loop {
            let next = {
                let mut state = self.inner.state.lock();
                loop {
                    if state.pending.is_empty() {
                        break None;
                    }
                    let id = state.pending.remove(0);
                    match state.records.get(&id) {
                        Some(r) if r.status == Status::Pending => break Some(id),
                        // Cancelled or otherwise stale entry
                        _ => continue,
                    }
                }
            };
            let Some(id) = next else { break };
            self.process_one(&processor, id).await;
        }
    }

    /// Spawns the background drive loop.
    ///
    /// Wakes whenever a record becomes runnable; exits after
    /// [`shutdown`](Self::shutdown).
    pub fn spawn_driver(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let mut shutdown = self.inner.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                manager.drive_pending().await;
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = manager.inner.runnable.notified() => {}
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    async fn process_one(&self, processor: &Arc<dyn EventProcessor>, id: RecordId) {
        if let Err(err) = self.start_processing(id).await {
            tracing::debug!(record = %id, error = %err, "skipping queued record");
            return;
        }
        let Some(record) = self.record(id) else { return };
        let recorder = PhaseRecorder {
            inner: Arc::downgrade(&self.inner),
            id,
        };
        match processor.process(record, recorder).await {
            Ok(result) => {
                // A timeout or cancellation may have beaten us to a
                // terminal status; that is not an error here.
                if let Err(err) = self.complete_event(id, Some(result)).await {
                    tracing::debug!(record = %id, error = %err, "late completion ignored");
                }
            }
            Err(process_err) => {
                if let Err(err) = self.fail_event(id, process_err.to_string()).await {
                    tracing::debug!(record = %id, error = %err, "late failure ignored");
                }
            }
        }
    }

    // ── Persistence & recovery ───────────────────────────────

    /// Reloads non-terminal records from the store.
    ///
    /// - `processing`/`retrying` records are demoted to `pending`: the
    ///   prior process died mid-flight, so in-flight work is restarted
    ///   from scratch (at-least-once).
    /// - Records older than the recovery TTL, and terminal leftovers,
    ///   are deleted from the store instead of reloaded.
    /// - Malformed or cyclic payloads drop that record only; the pass
    ///   continues.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Store`] only if the key listing itself fails;
    /// per-record failures are contained.
    pub async fn recover(&self) -> Result<RecoveryReport, LifecycleError> {
        let Some(store) = self.inner.store.clone() else {
            return Ok(RecoveryReport::default());
        };
        let keys = store.keys(&self.inner.config.key_prefix).await?;
        let ttl = chrono::Duration::from_std(self.inner.config.recovery_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let now = Utc::now();
        let mut report = RecoveryReport::default();
        let mut loaded: HashMap<RecordId, LifecycleRecord> = HashMap::new();

        for key in keys {
            let json = match store.get(&key).await {
                Ok(Some(json)) => json,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "unreadable record skipped in recovery");
                    report.dropped += 1;
                    continue;
                }
            };
            match serde_json::from_str::<LifecycleRecord>(&json) {
                Ok(record) => {
                    if record.status.is_terminal()
                        || now.signed_duration_since(record.created_at) > ttl
                    {
                        let _ = store.delete(&key).await;
                        report.discarded += 1;
                        continue;
                    }
                    loaded.insert(record.id, record);
                }
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "malformed record dropped in recovery");
                    let _ = store.delete(&key).await;
                    report.dropped += 1;
                }
            }
        }

        // A partially discarded graph can contain cycles the submit-time
        // check never admitted; drop any record that can reach itself.
        let cyclic: Vec<RecordId> = loaded
            .keys()
            .copied()
            .filter(|id| {
                loaded
                    .get(id)
                    .map_or(false, |r| {
                        r.depends_on.iter().any(|dep| has_path(&loaded, *dep, *id))
                    })
            })
            .collect();
        for id in cyclic {
            tracing::warn!(record = %id, "cyclic record dropped in recovery");
            loaded.remove(&id);
            self.remove_persisted(id).await;
            report.dropped += 1;
        }

        // Rebuild reverse edges from the surviving depends_on lists.
        for record in loaded.values_mut() {
            record.dependents.clear();
        }
        let edges: Vec<(RecordId, RecordId)> = loaded
            .values()
            .flat_map(|r| r.depends_on.iter().map(|dep| (*dep, r.id)).collect::<Vec<_>>())
            .collect();
        for (dep, dependent) in edges {
            if let Some(record) = loaded.get_mut(&dep) {
                record.dependents.push(dependent);
            }
        }

        let mut demoted = Vec::new();
        for record in loaded.values_mut() {
            if matches!(record.status, Status::Processing | Status::Retrying) {
                record.status = Status::Pending;
                record.phase = Phase::Queued;
                record.started_at = None;
                record.checkpoint(Phase::Queued, true, None);
                report.demoted += 1;
                demoted.push(record.clone());
            }
        }

        {
            let mut state = self.inner.state.lock();
            report.restored = loaded.len();
            let mut runnable: Vec<RecordId> = loaded
                .values()
                .filter(|r| {
                    r.status == Status::Pending
                        && (r.resolved
                            || r.depends_on.iter().all(|dep| {
                                loaded
                                    .get(dep)
                                    .is_some_and(|d| d.status == Status::Completed)
                            }))
                })
                .map(|r| r.id)
                .collect();
            runnable.sort_by(|a, b| {
                let ra = &loaded[a];
                let rb = &loaded[b];
                rb.priority
                    .cmp(&ra.priority)
                    .then(ra.created_at.cmp(&rb.created_at))
            });
            for (id, record) in loaded {
                state.records.insert(id, record);
            }
            for id in runnable {
                if !state.pending.contains(&id) {
                    state.pending.push(id);
                }
            }
        }

        for record in &demoted {
            self.persist(record).await;
        }
        tracing::info!(
            restored = report.restored,
            demoted = report.demoted,
            discarded = report.discarded,
            dropped = report.dropped,
            "lifecycle recovery complete"
        );
        self.inner.runnable.notify_one();
        Ok(report)
    }

    // ── Cleanup sweep ────────────────────────────────────────

    /// Evicts terminal records per the sweep policy.
    ///
    /// Age-based eviction first, then oldest-first eviction down to the
    /// record-count budget. `keep_completed`/`keep_failed` exempt those
    /// outcomes entirely. Durable copies are removed alongside.
    pub async fn sweep(&self) -> SweepReport {
        let policy = self.inner.config.sweep;
        let max_age = chrono::Duration::from_std(policy.max_age)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let now = Utc::now();

        let evicted: Vec<RecordId> = {
            let mut state = self.inner.state.lock();
            let exempt = |r: &LifecycleRecord| {
                (policy.keep_completed && r.status == Status::Completed)
                    || (policy.keep_failed && r.status == Status::Failed)
            };

            let mut victims: Vec<RecordId> = state
                .records
                .values()
                .filter(|r| {
                    r.is_terminal()
                        && !exempt(r)
                        && now.signed_duration_since(r.created_at) > max_age
                })
                .map(|r| r.id)
                .collect();

            let remaining = state.records.len() - victims.len();
            if remaining > policy.max_records {
                let overflow = remaining - policy.max_records;
                let mut candidates: Vec<(chrono::DateTime<Utc>, RecordId)> = state
                    .records
                    .values()
                    .filter(|r| r.is_terminal() && !exempt(r) && !victims.contains(&r.id))
                    .map(|r| (r.created_at, r.id))
                    .collect();
                candidates.sort_by_key(|(created_at, _)| *created_at);
                victims.extend(candidates.into_iter().take(overflow).map(|(_, id)| id));
            }

            for id in &victims {
                state.records.remove(id);
            }
            victims
        };

        for id in &evicted {
            self.remove_persisted(*id).await;
        }
        SweepReport {
            evicted: evicted.len(),
            remaining: self.len(),
        }
    }

    /// Spawns the periodic sweeper; exits after
    /// [`shutdown`](Self::shutdown).
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let interval = self.inner.config.sweep.interval;
        let mut shutdown = self.inner.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.changed() => break,
                }
                let report = manager.sweep().await;
                if report.evicted > 0 {
                    tracing::debug!(
                        evicted = report.evicted,
                        remaining = report.remaining,
                        "cleanup sweep"
                    );
                }
            }
        })
    }

    /// Signals the drive loop and sweeper to exit.
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown.send(true);
    }

    // ── Internals ────────────────────────────────────────────

    /// Priority-ordered stable insert into the pending queue.
    fn enqueue(state: &mut ManagerState, id: RecordId) {
        if state.pending.contains(&id) {
            return;
        }
        let Some(priority) = state.records.get(&id).map(|r| r.priority) else {
            return;
        };
        let pos = {
            let records = &state.records;
            state
                .pending
                .iter()
                .position(|p| records.get(p).map_or(true, |r| r.priority < priority))
                .unwrap_or(state.pending.len())
        };
        state.pending.insert(pos, id);
    }

    async fn force_timeout(&self, id: RecordId, attempt: u32, timeout_ms: u64) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get_mut(&id) else {
                return;
            };
            // Only the attempt that armed this watchdog may fire it.
            if record.status != Status::Processing || record.retry_count != attempt {
                return;
            }
            let phase = record.phase;
            record.finalize(Status::Timeout);
            record.error = Some(format!("processing exceeded {timeout_ms}ms"));
            record.checkpoint(phase, false, record.error.clone());
            record.clone()
        };

        tracing::warn!(record = %id, event = %snapshot.event, timeout_ms, "record timed out");
        self.persist(&snapshot).await;
        self.fire_terminal(&snapshot);
    }

    async fn requeue(&self, id: RecordId) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.records.get_mut(&id) else {
                return;
            };
            // Cancelled while backing off
            if record.status != Status::Retrying {
                return;
            }
            record.status = Status::Pending;
            record.phase = Phase::Queued;
            record.checkpoint(Phase::Queued, true, None);
            let snapshot = record.clone();
            Self::enqueue(&mut state, id);
            snapshot
        };
        self.persist(&snapshot).await;
        self.inner.runnable.notify_one();
    }

    fn key_for(&self, id: RecordId) -> String {
        format!("{}{}", self.inner.config.key_prefix, id.uuid())
    }

    /// Best-effort persistence; store failures are logged, never fatal.
    async fn persist(&self, record: &LifecycleRecord) {
        let Some(store) = &self.inner.store else { return };
        match serde_json::to_string(record) {
            Ok(json) => {
                if let Err(err) = store.set(&self.key_for(record.id), &json).await {
                    tracing::warn!(record = %record.id, error = %err, "persist failed");
                }
            }
            Err(err) => {
                tracing::warn!(record = %record.id, error = %err, "record serialization failed");
            }
        }
    }

    async fn remove_persisted(&self, id: RecordId) {
        if let Some(store) = &self.inner.store {
            let _ = store.delete(&self.key_for(id)).await;
        }
    }

    fn fire_terminal(&self, record: &LifecycleRecord) {
        if let Some(hook) = self.inner.on_terminal.read().as_ref() {
            hook(record);
        }
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LifecycleManager")
            .field("records", &state.records.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Whether `from` can reach `to` following `depends_on` edges.
fn has_path(
    records: &HashMap<RecordId, LifecycleRecord>,
    from: RecordId,
    to: RecordId,
) -> bool {
    let mut stack = vec![from];
    let mut visited = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(record) = records.get(&current) {
            stack.extend(record.depends_on.iter().copied());
        }
    }
    false
}
