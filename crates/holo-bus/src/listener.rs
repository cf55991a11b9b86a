//! Listener trait and subscription options.

use crate::ListenerError;
use holo_event::{NamePattern, ShellEvent};
use std::time::Duration;

/// A bus listener.
///
/// Implemented automatically for any
/// `Fn(&ShellEvent) -> Result<(), ListenerError> + Send + Sync` closure,
/// which is how subsystems usually subscribe. Implement the trait
/// directly when the handler carries its own state.
///
/// # Failure Containment
///
/// Returning `Err` (or panicking) is contained at the dispatch site: the
/// failure is logged and sibling listeners still run.
pub trait EventListener: Send + Sync {
    /// Handles one emitted event.
    fn on_event(&self, event: &ShellEvent) -> Result<(), ListenerError>;
}

impl<F> EventListener for F
where
    F: Fn(&ShellEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &ShellEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Options for [`EventBus::subscribe`](crate::EventBus::subscribe).
///
/// # Example
///
/// ```
/// use holo_bus::SubscribeOptions;
///
/// let opts = SubscribeOptions::default()
///     .with_priority(10)
///     .with_namespace("window-manager")
///     .once();
/// assert_eq!(opts.priority, 10);
/// assert!(opts.once);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Dispatch priority; higher runs earlier. Ties run in insertion
    /// order. Default 0.
    pub priority: i32,

    /// Remove the listener after its first invocation.
    pub once: bool,

    /// Logical owner tag used for bulk cleanup via
    /// [`ListenerFilter`](crate::ListenerFilter).
    pub namespace: Option<String>,

    /// Per-listener override of the stale-age threshold used by
    /// `cleanup_stale_listeners`.
    pub stale_after: Option<Duration>,
}

impl SubscribeOptions {
    /// Sets the dispatch priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the listener as fire-once.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Tags the listener with an owning namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Overrides the stale-age threshold for this listener.
    #[must_use]
    pub fn with_stale_after(mut self, age: Duration) -> Self {
        self.stale_after = Some(age);
        self
    }
}

/// Criteria for bulk listener removal.
///
/// A listener is removed only if it matches **every** supplied criterion
/// (AND semantics). An empty filter matches nothing — bulk removal of
/// everything goes through `unsubscribe_all` per event instead.
#[derive(Debug, Clone, Default)]
pub struct ListenerFilter {
    /// Match listeners tagged with this namespace.
    pub namespace: Option<String>,

    /// Match listeners registered with exactly this priority.
    pub priority: Option<i32>,

    /// Match listeners whose event name matches this pattern.
    pub pattern: Option<NamePattern>,
}

impl ListenerFilter {
    /// Creates a filter matching a namespace.
    #[must_use]
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Adds a priority criterion.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Adds an event-name pattern criterion.
    #[must_use]
    pub fn with_pattern(mut self, pattern: NamePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Returns `true` if no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespace.is_none() && self.priority.is_none() && self.pattern.is_none()
    }
}
