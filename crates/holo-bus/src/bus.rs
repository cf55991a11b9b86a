//! The event bus.

use crate::listener::{EventListener, ListenerFilter, SubscribeOptions};
use crate::registry::Registry;
use crate::{BusConfig, BusError, ListenerError};
use holo_event::ShellEvent;
use holo_types::ListenerId;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Live bus statistics. Read-only snapshot, see [`EventBus::stats`].
#[derive(Debug, Clone)]
pub struct BusStats {
    /// Total `emit`/`emit_async` calls since the bus was created.
    pub total_emits: u64,
    /// Live listener count across all events.
    pub total_listeners: usize,
    /// Live listener count per event name.
    pub listeners_per_event: HashMap<String, usize>,
    /// Approximate registry memory footprint in bytes.
    pub approx_memory_bytes: usize,
}

struct BusInner {
    registry: RwLock<Registry>,
    config: BusConfig,
    emits: AtomicU64,
}

/// The shell's shared broadcast medium.
///
/// Cheap to clone (internally an `Arc`); consumers receive a handle from
/// the engine rather than reaching into global state.
///
/// # Reentrancy
///
/// `emit` dispatches over a snapshot taken under a short-lived read lock,
/// then runs handlers with no lock held. Handlers may therefore call any
/// bus method — including `subscribe`, `unsubscribe` and nested `emit` —
/// without affecting the in-flight fan-out.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates a bus with the given configuration.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: RwLock::new(Registry::new(config.max_listeners_per_event)),
                config,
                emits: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the bus configuration.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Registers a listener for an event name.
    ///
    /// Insertion keeps the event's listener list sorted by priority
    /// descending; equal priorities run in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::CapacityExceeded`] if the event already has
    /// the configured maximum number of listeners.
    pub fn subscribe<L>(
        &self,
        event: &str,
        listener: L,
        opts: SubscribeOptions,
    ) -> Result<ListenerId, BusError>
    where
        L: EventListener + 'static,
    {
        self.inner
            .registry
            .write()
            .insert(event, Arc::new(listener), &opts)
    }

    /// Removes a single listener. Returns `true` if it was found.
    pub fn unsubscribe(&self, event: &str, id: ListenerId) -> bool {
        self.inner.registry.write().remove(event, id)
    }

    /// Removes every listener for an event name. Returns the count.
    pub fn unsubscribe_all(&self, event: &str) -> usize {
        self.inner.registry.write().remove_all(event)
    }

    /// Bulk removal by filter; AND semantics across supplied criteria.
    ///
    /// This is how namespace-scoped callers self-clean without tracking
    /// individual listener ids:
    ///
    /// ```
    /// use holo_bus::{EventBus, ListenerFilter, SubscribeOptions};
    ///
    /// let bus = EventBus::new(Default::default());
    /// bus.subscribe(
    ///     "app:opened",
    ///     |_ev: &holo_event::ShellEvent| Ok(()),
    ///     SubscribeOptions::default().with_namespace("dock"),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(bus.unsubscribe_by_filter(&ListenerFilter::namespace("dock")), 1);
    /// ```
    pub fn unsubscribe_by_filter(&self, filter: &ListenerFilter) -> usize {
        self.inner.registry.write().remove_filtered(filter)
    }

    /// Emits an event synchronously to all matching listeners.
    ///
    /// Listeners fire strictly in descending-priority order on the
    /// caller's task. One failing (or panicking) listener is logged and
    /// does not stop the remaining listeners. `once` listeners are
    /// removed after this dispatch, success or failure.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: &ShellEvent) -> usize {
        let snapshot = self.inner.registry.read().snapshot(event.name());
        self.inner.emits.fetch_add(1, Ordering::Relaxed);

        let mut fired_once = Vec::new();
        for entry in &snapshot {
            match std::panic::catch_unwind(AssertUnwindSafe(|| entry.handler.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        listener = %entry.id,
                        event = event.name(),
                        error = %err,
                        "listener failed during dispatch"
                    );
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::warn!(
                        listener = %entry.id,
                        event = event.name(),
                        panic = %message,
                        "listener panicked during dispatch"
                    );
                }
            }
            if entry.once {
                fired_once.push(entry.id);
            }
        }

        if !fired_once.is_empty() {
            let mut registry = self.inner.registry.write();
            for id in fired_once {
                // No-op when the handler already removed itself.
                registry.remove(event.name(), id);
            }
        }

        snapshot.len()
    }

    /// Emits an event after yielding to the task queue once.
    ///
    /// Resolves once the synchronous fan-out has completed; it does not
    /// wait for asynchronous work started inside handlers.
    pub async fn emit_async(&self, event: ShellEvent) -> usize {
        tokio::task::yield_now().await;
        self.emit(&event)
    }

    /// Waits for the next emission of `event`, with an optional timeout.
    ///
    /// Race-free: whichever of (event fires, timeout fires) happens first
    /// wins, and the loser's side effect is a no-op — a late event finds
    /// the waiting listener already removed, and a late timeout finds the
    /// oneshot already consumed.
    ///
    /// # Errors
    ///
    /// - [`BusError::WaitTimeout`] if the timeout elapses first;
    /// - [`BusError::WaitCancelled`] if the waiting listener is removed
    ///   by a bulk unsubscribe or stale sweep before the event fires.
    pub async fn wait_for(
        &self,
        event: &str,
        timeout: Option<Duration>,
    ) -> Result<ShellEvent, BusError> {
        let (tx, rx) = tokio::sync::oneshot::channel::<ShellEvent>();
        let slot = Mutex::new(Some(tx));
        let id = self.subscribe(
            event,
            move |ev: &ShellEvent| -> Result<(), ListenerError> {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(ev.clone());
                }
                Ok(())
            },
            SubscribeOptions::default().once(),
        )?;

        match timeout {
            Some(window) => match tokio::time::timeout(window, rx).await {
                Ok(Ok(ev)) => Ok(ev),
                Ok(Err(_)) => Err(BusError::WaitCancelled {
                    event: event.to_string(),
                }),
                Err(_) => {
                    self.unsubscribe(event, id);
                    Err(BusError::WaitTimeout {
                        event: event.to_string(),
                        timeout_ms: window.as_millis() as u64,
                    })
                }
            },
            None => rx.await.map_err(|_| BusError::WaitCancelled {
                event: event.to_string(),
            }),
        }
    }

    /// Removes listeners older than the age threshold, across all events.
    ///
    /// Intended for periodic reclamation of listeners whose owning scope
    /// forgot to unsubscribe. Per-listener `stale_after` overrides take
    /// precedence over `max_age`.
    pub fn cleanup_stale_listeners(&self, max_age: Duration) -> usize {
        let removed = self.inner.registry.write().remove_stale(max_age);
        if removed > 0 {
            tracing::debug!(removed, "reclaimed stale listeners");
        }
        removed
    }

    /// Returns a statistics snapshot. Read-only, side-effect-free.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        let registry = self.inner.registry.read();
        BusStats {
            total_emits: self.inner.emits.load(Ordering::Relaxed),
            total_listeners: registry.total(),
            listeners_per_event: registry.counts(),
            approx_memory_bytes: registry.approx_memory_bytes(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("EventBus")
            .field("total_listeners", &stats.total_listeners)
            .field("total_emits", &stats.total_emits)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    fn theme(theme: &str) -> ShellEvent {
        ShellEvent::ThemeChanged {
            theme: theme.into(),
        }
    }

    /// Shared order log for ordering assertions.
    fn order_log() -> Arc<PlMutex<Vec<i32>>> {
        Arc::new(PlMutex::new(Vec::new()))
    }

    fn logging_listener(
        log: &Arc<PlMutex<Vec<i32>>>,
        tag: i32,
    ) -> impl Fn(&ShellEvent) -> Result<(), ListenerError> + Send + Sync {
        let log = Arc::clone(log);
        move |_ev| {
            log.lock().push(tag);
            Ok(())
        }
    }

    // ── Priority ordering ────────────────────────────────────

    #[test]
    fn listeners_fire_in_descending_priority() {
        let bus = EventBus::default();
        let log = order_log();

        for priority in [1, 10, 5] {
            bus.subscribe(
                "theme:changed",
                logging_listener(&log, priority),
                SubscribeOptions::default().with_priority(priority),
            )
            .unwrap();
        }

        bus.emit(&theme("dark"));
        assert_eq!(*log.lock(), vec![10, 5, 1]);
    }

    #[test]
    fn equal_priority_runs_in_insertion_order() {
        let bus = EventBus::default();
        let log = order_log();
        bus.subscribe("e", logging_listener(&log, 1), SubscribeOptions::default())
            .unwrap();
        bus.subscribe("e", logging_listener(&log, 2), SubscribeOptions::default())
            .unwrap();

        bus.emit(&ShellEvent::custom("e", serde_json::Value::Null));
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    // ── Once semantics ───────────────────────────────────────

    #[test]
    fn once_listener_fires_exactly_once() {
        let bus = EventBus::default();
        let log = order_log();
        bus.subscribe(
            "theme:changed",
            logging_listener(&log, 7),
            SubscribeOptions::default().once(),
        )
        .unwrap();

        bus.emit(&theme("dark"));
        bus.emit(&theme("light"));

        assert_eq!(*log.lock(), vec![7]);
        assert_eq!(bus.stats().total_listeners, 0);
    }

    #[test]
    fn once_listener_removed_even_on_failure() {
        let bus = EventBus::default();
        bus.subscribe(
            "e",
            |_ev: &ShellEvent| Err(ListenerError::new("boom")),
            SubscribeOptions::default().once(),
        )
        .unwrap();

        bus.emit(&ShellEvent::custom("e", serde_json::Value::Null));
        assert_eq!(bus.stats().total_listeners, 0);
    }

    // ── Isolation ────────────────────────────────────────────

    #[test]
    fn failing_listener_does_not_stop_siblings() {
        let bus = EventBus::default();
        let log = order_log();

        bus.subscribe(
            "e",
            |_ev: &ShellEvent| -> Result<(), ListenerError> { Err("first fails".into()) },
            SubscribeOptions::default().with_priority(10),
        )
        .unwrap();
        bus.subscribe(
            "e",
            logging_listener(&log, 2),
            SubscribeOptions::default().with_priority(1),
        )
        .unwrap();

        let delivered = bus.emit(&ShellEvent::custom("e", serde_json::Value::Null));
        assert_eq!(delivered, 2);
        assert_eq!(*log.lock(), vec![2]);
    }

    #[test]
    fn panicking_listener_is_contained() {
        let bus = EventBus::default();
        let log = order_log();

        bus.subscribe(
            "e",
            |_ev: &ShellEvent| -> Result<(), ListenerError> { panic!("listener exploded") },
            SubscribeOptions::default().with_priority(10),
        )
        .unwrap();
        bus.subscribe(
            "e",
            logging_listener(&log, 1),
            SubscribeOptions::default().with_priority(1),
        )
        .unwrap();

        bus.emit(&ShellEvent::custom("e", serde_json::Value::Null));
        assert_eq!(*log.lock(), vec![1]);
    }

    // ── Reentrancy ───────────────────────────────────────────

    #[test]
    fn handler_may_subscribe_during_dispatch() {
        let bus = EventBus::default();
        let log = order_log();

        let bus_handle = bus.clone();
        let log_handle = Arc::clone(&log);
        bus.subscribe(
            "e",
            move |_ev: &ShellEvent| -> Result<(), ListenerError> {
                let inner_log = Arc::clone(&log_handle);
                bus_handle
                    .subscribe(
                        "e",
                        move |_ev: &ShellEvent| {
                            inner_log.lock().push(99);
                            Ok(())
                        },
                        SubscribeOptions::default(),
                    )
                    .unwrap();
                Ok(())
            },
            SubscribeOptions::default(),
        )
        .unwrap();

        // The listener added mid-dispatch must not run during this emit.
        let delivered = bus.emit(&ShellEvent::custom("e", serde_json::Value::Null));
        assert_eq!(delivered, 1);
        assert!(log.lock().is_empty());

        // It runs on the next emit.
        bus.emit(&ShellEvent::custom("e", serde_json::Value::Null));
        assert_eq!(*log.lock(), vec![99]);
    }

    // ── Capacity ─────────────────────────────────────────────

    #[test]
    fn capacity_error_at_subscribe() {
        let bus = EventBus::new(BusConfig {
            max_listeners_per_event: 1,
            ..Default::default()
        });
        bus.subscribe("e", |_ev: &ShellEvent| Ok(()), SubscribeOptions::default())
            .unwrap();

        let err = bus
            .subscribe("e", |_ev: &ShellEvent| Ok(()), SubscribeOptions::default())
            .unwrap_err();
        assert!(matches!(err, BusError::CapacityExceeded { limit: 1, .. }));
    }

    // ── Namespace cleanup ────────────────────────────────────

    #[test]
    fn namespace_filter_removes_exactly_matching() {
        let bus = EventBus::default();
        for i in 0..5 {
            bus.subscribe(
                &format!("event:{i}"),
                |_ev: &ShellEvent| Ok(()),
                SubscribeOptions::default().with_namespace("ns1"),
            )
            .unwrap();
        }
        bus.subscribe(
            "event:0",
            |_ev: &ShellEvent| Ok(()),
            SubscribeOptions::default().with_namespace("ns2"),
        )
        .unwrap();
        bus.subscribe("event:1", |_ev: &ShellEvent| Ok(()), SubscribeOptions::default())
            .unwrap();

        let removed = bus.unsubscribe_by_filter(&ListenerFilter::namespace("ns1"));
        assert_eq!(removed, 5);
        assert_eq!(bus.stats().total_listeners, 2);
    }

    // ── wait_for ─────────────────────────────────────────────

    #[tokio::test]
    async fn wait_for_resolves_with_payload() {
        let bus = EventBus::default();
        let emitter = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            emitter.emit(&theme("dark"));
        });

        let ev = bus
            .wait_for("theme:changed", Some(Duration::from_millis(500)))
            .await
            .unwrap();
        assert_eq!(ev, theme("dark"));
        // Once listener consumed; nothing left behind.
        assert_eq!(bus.stats().total_listeners, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_times_out_and_late_event_is_noop() {
        let bus = EventBus::default();

        let err = bus
            .wait_for("theme:changed", Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::WaitTimeout { timeout_ms: 50, .. }));
        assert_eq!(bus.stats().total_listeners, 0);

        // A later emission must not resurrect the resolved wait.
        let delivered = bus.emit(&theme("dark"));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn wait_for_cancelled_when_listener_removed() {
        let bus = EventBus::default();
        let cleaner = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cleaner.unsubscribe_all("theme:changed");
        });

        let err = bus.wait_for("theme:changed", None).await.unwrap_err();
        assert!(matches!(err, BusError::WaitCancelled { .. }));
    }

    // ── emit_async ───────────────────────────────────────────

    #[tokio::test]
    async fn emit_async_defers_then_delivers() {
        let bus = EventBus::default();
        let log = order_log();
        bus.subscribe(
            "theme:changed",
            logging_listener(&log, 1),
            SubscribeOptions::default(),
        )
        .unwrap();

        let delivered = bus.emit_async(theme("dark")).await;
        assert_eq!(delivered, 1);
        assert_eq!(*log.lock(), vec![1]);
    }

    // ── Stale cleanup & stats ────────────────────────────────

    #[test]
    fn stale_cleanup_counts() {
        let bus = EventBus::default();
        bus.subscribe(
            "e",
            |_ev: &ShellEvent| Ok(()),
            SubscribeOptions::default().with_stale_after(Duration::ZERO),
        )
        .unwrap();
        bus.subscribe("e", |_ev: &ShellEvent| Ok(()), SubscribeOptions::default())
            .unwrap();

        assert_eq!(bus.cleanup_stale_listeners(Duration::from_secs(3600)), 1);
        assert_eq!(bus.stats().total_listeners, 1);
    }

    #[test]
    fn stats_track_emits_and_listeners() {
        let bus = EventBus::default();
        bus.subscribe("a", |_ev: &ShellEvent| Ok(()), SubscribeOptions::default())
            .unwrap();
        bus.subscribe("a", |_ev: &ShellEvent| Ok(()), SubscribeOptions::default())
            .unwrap();

        bus.emit(&ShellEvent::custom("a", serde_json::Value::Null));
        bus.emit(&ShellEvent::custom("b", serde_json::Value::Null));

        let stats = bus.stats();
        assert_eq!(stats.total_emits, 2);
        assert_eq!(stats.total_listeners, 2);
        assert_eq!(stats.listeners_per_event["a"], 2);
        assert!(stats.approx_memory_bytes > 0);
    }
}
