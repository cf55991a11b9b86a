//! Middleware trait and testing utilities.

use crate::{DispatchContext, MiddlewareAction, MiddlewarePhase};
use std::time::Duration;

/// A single middleware.
///
/// Middlewares are registered with the
/// [`MiddlewareExecutor`](crate::MiddlewareExecutor) and run as a chain
/// around event dispatch. Each middleware declares:
///
/// - A phase (when it runs)
/// - A priority (execution order within the phase; higher runs earlier)
/// - An optional activation condition over the context
/// - An optional per-execution timeout
///
/// # Thread Safety
///
/// Middlewares must be `Send + Sync`; the executor may run chains from
/// any task.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    /// Human-readable name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Which phase this middleware runs in.
    fn phase(&self) -> MiddlewarePhase;

    /// Priority (higher = earlier). Default: 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Activation condition. A middleware whose `applies` returns
    /// `false` for a context is skipped for that dispatch. Default:
    /// always active.
    fn applies(&self, ctx: &DispatchContext) -> bool {
        let _ = ctx;
        true
    }

    /// Per-execution timeout. If the returned future does not settle in
    /// time the chain treats this middleware as failed. Default: none.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Executes the middleware.
    ///
    /// # Returns
    ///
    /// - `Continue(ctx)` — pass the modified context down the chain
    /// - `Halt` — short-circuit the remainder of the chain
    /// - `Fail(reason)` — trigger the error phase, then re-raise
    async fn handle(&self, ctx: DispatchContext) -> MiddlewareAction;
}

/// Test utilities for the middleware system.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type ActionFn = Box<dyn Fn(DispatchContext) -> MiddlewareAction + Send + Sync>;
    type AppliesFn = Box<dyn Fn(&DispatchContext) -> bool + Send + Sync>;

    /// A mock middleware for testing.
    ///
    /// Returns a configurable `MiddlewareAction` on every `handle` call
    /// and tracks invocation count via `call_count`.
    pub struct MockMiddleware {
        /// Middleware name.
        pub name: String,
        /// Phase.
        pub phase: MiddlewarePhase,
        /// Priority.
        pub priority: i32,
        /// Optional timeout.
        pub timeout: Option<Duration>,
        /// Optional artificial delay before returning.
        pub delay: Option<Duration>,
        /// Activation predicate.
        pub applies_fn: Option<AppliesFn>,
        /// The action to produce on every handle() call.
        pub action_fn: ActionFn,
        /// Number of times handle() has been called.
        pub call_count: Arc<AtomicUsize>,
    }

    impl MockMiddleware {
        /// Creates a pass-through mock that returns `Continue(ctx)`.
        pub fn pass_through(name: &str, phase: MiddlewarePhase) -> Self {
            Self {
                name: name.to_string(),
                phase,
                priority: 0,
                timeout: None,
                delay: None,
                applies_fn: None,
                action_fn: Box::new(|ctx| MiddlewareAction::next(ctx)),
                call_count: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Creates a mock that modifies the context via the given function.
        pub fn modifier(
            name: &str,
            phase: MiddlewarePhase,
            modify: impl Fn(&mut DispatchContext) + Send + Sync + 'static,
        ) -> Self {
            let mut mock = Self::pass_through(name, phase);
            mock.action_fn = Box::new(move |mut ctx| {
                modify(&mut ctx);
                MiddlewareAction::next(ctx)
            });
            mock
        }

        /// Creates a mock that halts the chain.
        pub fn halter(name: &str, phase: MiddlewarePhase) -> Self {
            let mut mock = Self::pass_through(name, phase);
            mock.action_fn = Box::new(|_ctx| MiddlewareAction::Halt);
            mock
        }

        /// Creates a mock that fails with the given reason.
        pub fn failer(name: &str, phase: MiddlewarePhase, reason: &str) -> Self {
            let reason = reason.to_string();
            let mut mock = Self::pass_through(name, phase);
            mock.action_fn = Box::new(move |_ctx| MiddlewareAction::Fail(reason.clone()));
            mock
        }

        /// Sets the priority.
        #[must_use]
        pub fn with_priority(mut self, priority: i32) -> Self {
            self.priority = priority;
            self
        }

        /// Sets the per-execution timeout.
        #[must_use]
        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        /// Adds an artificial delay before the action is produced.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Sets the activation predicate.
        #[must_use]
        pub fn with_applies(
            mut self,
            applies: impl Fn(&DispatchContext) -> bool + Send + Sync + 'static,
        ) -> Self {
            self.applies_fn = Some(Box::new(applies));
            self
        }

        /// Returns the number of times this middleware has executed.
        pub fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Middleware for MockMiddleware {
        fn name(&self) -> &str {
            &self.name
        }

        fn phase(&self) -> MiddlewarePhase {
            self.phase
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn applies(&self, ctx: &DispatchContext) -> bool {
            self.applies_fn.as_ref().map_or(true, |f| f(ctx))
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }

        async fn handle(&self, ctx: DispatchContext) -> MiddlewareAction {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.action_fn)(ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockMiddleware;
    use super::*;
    use serde_json::json;

    fn ctx() -> DispatchContext {
        DispatchContext::new("app:opened", json!({"app_id": "files"}), "test")
    }

    #[tokio::test]
    async fn mock_pass_through() {
        let mw = MockMiddleware::pass_through("m", MiddlewarePhase::Before);
        let action = mw.handle(ctx()).await;
        assert!(action.is_continue());
        assert_eq!(mw.calls(), 1);
    }

    #[tokio::test]
    async fn mock_modifier() {
        let mw = MockMiddleware::modifier("m", MiddlewarePhase::Before, |ctx| {
            ctx.metadata.insert("seen".into(), json!(true));
        });
        if let MiddlewareAction::Continue(out) = mw.handle(ctx()).await {
            assert_eq!(out.metadata["seen"], json!(true));
        } else {
            panic!("expected Continue");
        }
    }

    #[tokio::test]
    async fn mock_failer() {
        let mw = MockMiddleware::failer("m", MiddlewarePhase::Before, "denied");
        let action = mw.handle(ctx()).await;
        assert!(action.is_fail());
    }

    #[test]
    fn default_trait_values() {
        let mw = MockMiddleware::pass_through("m", MiddlewarePhase::After);
        assert_eq!(mw.priority(), 0);
        assert!(mw.applies(&ctx()));
        assert!(mw.timeout().is_none());
    }

    #[test]
    fn applies_predicate() {
        let mw = MockMiddleware::pass_through("m", MiddlewarePhase::Before)
            .with_applies(|ctx| ctx.event.starts_with("window:"));
        assert!(!mw.applies(&ctx()));
        let window_ctx = DispatchContext::new("window:resize", json!({}), "test");
        assert!(mw.applies(&window_ctx));
    }
}
