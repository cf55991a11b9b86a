//! Event lifecycle tracking for the Holodesk shell.
//!
//! A raw bus emission is fire-and-forget. Some units of work need more:
//! retry with backoff, ordering behind other work, surviving a page
//! reload. The [`LifecycleManager`] wraps such work in a
//! [`LifecycleRecord`] and walks it through a status state machine,
//! checkpointing every transition.
//!
//! # State Machine
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!                    ▼                              │
//! submit ──► pending ──► processing ──► completed   │
//!                ▲           │   │                  │
//!                │           │   ├──► timeout       │
//!                │           │   ├──► cancelled     │
//!   (backoff)    │           ▼   │                  │
//!                └──────  retrying                  │
//!                            │                      │
//!                            └──► failed  (retry_count > max_retries)
//!
//! dependents of a completed record are re-evaluated and, when every
//! dependency is completed, pushed onto the pending queue ──────┘
//! ```
//!
//! # Pieces
//!
//! - [`LifecycleRecord`]: payload snapshot, status/phase, timestamps,
//!   checkpoints, retry bookkeeping, dependency adjacency
//! - [`LifecycleManager`]: owns the record map and pending queue, the
//!   retry/backoff and timeout timers, the cleanup sweep and recovery
//! - [`LifecycleStore`]: pluggable key/value persistence
//!   ([`MemoryStore`], [`JsonFileStore`])
//! - [`EventProcessor`]: optional auto-drive — the manager pulls
//!   runnable records and pushes them through the processor (the engine
//!   installs one that runs middleware + bus dispatch)
//!
//! # Delivery Semantics
//!
//! At-least-once, not exactly-once: recovery does not trust work that
//! was in flight when the process died — `processing` records are
//! demoted to `pending` and restarted from scratch. Persistence is
//! best-effort recovery, not a durable log; store failures are logged
//! and never fail the operation that triggered them.
//!
//! # Example
//!
//! ```
//! use holo_lifecycle::{LifecycleConfig, LifecycleManager, Status, SubmitOptions};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let manager = LifecycleManager::new(LifecycleConfig::default());
//!
//! let id = manager
//!     .submit("app:opened", json!({"app_id": "files"}), SubmitOptions::default())
//!     .await
//!     .unwrap();
//!
//! manager.start_processing(id).await.unwrap();
//! manager.complete_event(id, None).await.unwrap();
//! assert_eq!(manager.status_of(id), Some(Status::Completed));
//! # });
//! ```

mod config;
mod error;
mod manager;
mod processor;
mod record;
mod store;

pub use config::{LifecycleConfig, SweepPolicy};
pub use error::LifecycleError;
pub use manager::{
    LifecycleManager, PhaseRecorder, RecoveryReport, SubmitOptions, SweepReport,
};
pub use processor::{EventProcessor, ProcessError};
pub use record::{backoff_delay, Checkpoint, LifecycleRecord, Phase, Status};
pub use store::{
    default_store_path, JsonFileStore, LifecycleStore, MemoryStore, StoreError,
};
