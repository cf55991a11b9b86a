//! Chain actions returned by middlewares.

use crate::DispatchContext;

/// What happens after a middleware executes.
///
/// The executor advances the chain based on the returned action; a
/// middleware never invokes its successor directly, which is how
/// "continue exactly once" is enforced in the runner rather than by
/// convention.
#[derive(Debug)]
pub enum MiddlewareAction {
    /// Pass the (possibly modified) context to the next middleware.
    Continue(Box<DispatchContext>),

    /// Stop the remainder of the chain. Not a failure — the dispatch
    /// proceeds with the context as-is.
    Halt,

    /// Fail the chain. Triggers the error phase, then the failure is
    /// re-raised to the original caller.
    Fail(String),
}

impl MiddlewareAction {
    /// Shorthand for `Continue(Box::new(ctx))`.
    #[must_use]
    pub fn next(ctx: DispatchContext) -> Self {
        Self::Continue(Box::new(ctx))
    }

    /// Returns `true` for [`Continue`](Self::Continue).
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// Returns `true` for [`Halt`](Self::Halt).
    #[must_use]
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt)
    }

    /// Returns `true` for [`Fail`](Self::Fail).
    #[must_use]
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn predicates() {
        let ctx = DispatchContext::new("e", json!({}), "test");
        assert!(MiddlewareAction::next(ctx).is_continue());
        assert!(MiddlewareAction::Halt.is_halt());
        assert!(MiddlewareAction::Fail("x".into()).is_fail());
    }
}
