//! Middleware chain executor for the Holodesk event core.
//!
//! Cross-cutting concerns — permission checks, rate limiting, metrics,
//! caching — wrap event dispatch without the bus knowing about any of
//! them. Middlewares register into one of three phases and run as a
//! chain of responsibility with deterministic priority ordering.
//!
//! # Phases
//!
//! | Phase | When | Typical use |
//! |-------|------|-------------|
//! | [`Before`](MiddlewarePhase::Before) | ahead of bus dispatch | validation, security, suppression |
//! | [`After`](MiddlewarePhase::After) | after bus dispatch | metrics, caching |
//! | [`Error`](MiddlewarePhase::Error) | on any middleware failure | alerting, fallback |
//!
//! # Chain Semantics
//!
//! Each middleware receives the [`DispatchContext`] and returns a
//! [`MiddlewareAction`] deciding whether the chain continues. The
//! executor — not convention — advances the chain, so a middleware
//! cannot "call next twice"; returning [`Halt`](MiddlewareAction::Halt)
//! (or setting the context's `stop_propagation` flag) short-circuits the
//! remainder of the chain.
//!
//! A failure ([`Fail`](MiddlewareAction::Fail) or a per-middleware
//! timeout) triggers the `Error` phase with the triggering error
//! attached to the context, then is re-raised to the original caller.
//! The `Error` phase never recurses into itself.
//!
//! # Example
//!
//! ```
//! use holo_middleware::{
//!     DispatchContext, Middleware, MiddlewareAction, MiddlewareExecutor, MiddlewarePhase,
//! };
//!
//! struct Auditor;
//!
//! #[async_trait::async_trait]
//! impl Middleware for Auditor {
//!     fn name(&self) -> &str {
//!         "auditor"
//!     }
//!     fn phase(&self) -> MiddlewarePhase {
//!         MiddlewarePhase::Before
//!     }
//!     async fn handle(&self, mut ctx: DispatchContext) -> MiddlewareAction {
//!         ctx.metadata.insert("audited".into(), serde_json::json!(true));
//!         MiddlewareAction::Continue(Box::new(ctx))
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let executor = MiddlewareExecutor::new();
//! executor.register(std::sync::Arc::new(Auditor));
//!
//! let ctx = DispatchContext::new("app:opened", serde_json::json!({"app_id": "files"}), "shell");
//! let outcome = executor
//!     .execute(MiddlewarePhase::Before, ctx)
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.context.metadata["audited"], serde_json::json!(true));
//! # });
//! ```

mod action;
mod context;
mod error;
mod executor;
mod middleware;
mod phase;

pub use action::MiddlewareAction;
pub use context::DispatchContext;
pub use error::MiddlewareError;
pub use executor::{ChainOutcome, MiddlewareExecutor, MiddlewareStats};
pub use middleware::Middleware;
pub use phase::{MiddlewarePhase, UnknownPhase};

// Re-export testing utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Test utilities for the middleware system.
    //!
    //! Provides [`MockMiddleware`] for use in tests.
    pub use crate::middleware::testing::MockMiddleware;
}
