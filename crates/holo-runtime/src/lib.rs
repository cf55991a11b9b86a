//! Shell engine for the Holodesk event core.
//!
//! This crate wires the core together: one [`EventBus`], one
//! [`MiddlewareExecutor`] and one [`LifecycleManager`] owned by a
//! [`ShellEngine`] behind an explicit start/shutdown lifecycle. There is
//! no ambient global — subsystems receive a handle (or a clone of the
//! bus) from whoever built the engine.
//!
//! # Control Flow
//!
//! ```text
//! dispatch(event) ────► before-middleware ──► bus fan-out ──► after-middleware
//!                            │  (halt / prevent_default         │
//!                            │   suppresses the fan-out)        │
//!                            └────────── error-middleware ◄─────┘
//!                                        (on any failure, then re-raised)
//!
//! submit_tracked(event) ──► LifecycleManager record
//!       │ queued until dependencies complete
//!       ▼
//!   drive loop ──► the same before → fan-out → after pipeline,
//!                  with retry/backoff on failure and an observable
//!                  "lifecycle:error" event on terminal failure
//! ```
//!
//! # Example
//!
//! ```
//! use holo_event::ShellEvent;
//! use holo_runtime::ShellEngine;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let engine = ShellEngine::builder().build().await.unwrap();
//!
//! engine
//!     .bus()
//!     .subscribe(
//!         "theme:changed",
//!         |_ev: &ShellEvent| Ok(()),
//!         Default::default(),
//!     )
//!     .unwrap();
//!
//! let report = engine
//!     .dispatch(ShellEvent::ThemeChanged { theme: "dark".into() }, "settings")
//!     .await
//!     .unwrap();
//! assert_eq!(report.delivered, 1);
//!
//! engine.shutdown().await;
//! # });
//! ```

mod config;
mod engine;
mod error;

pub use config::EngineConfig;
pub use engine::{DispatchReport, EngineBuilder, ShellEngine};
pub use error::EngineError;

// Re-exports so embedders can depend on this crate alone
pub use holo_bus::{BusConfig, EventBus, ListenerFilter, SubscribeOptions};
pub use holo_event::ShellEvent;
pub use holo_lifecycle::{
    JsonFileStore, LifecycleConfig, LifecycleManager, LifecycleStore, MemoryStore, Status,
    SubmitOptions,
};
pub use holo_middleware::{
    DispatchContext, Middleware, MiddlewareAction, MiddlewareExecutor, MiddlewarePhase,
};
