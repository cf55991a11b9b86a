//! Listener registry — per-event ordered listener lists.
//!
//! Not exposed outside the crate; [`EventBus`](crate::EventBus) owns one
//! behind a lock and is the only mutator.

use crate::listener::{EventListener, ListenerFilter};
use crate::{BusError, SubscribeOptions};
use holo_types::ListenerId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A registered listener with metadata.
pub(crate) struct ListenerRecord {
    pub id: ListenerId,
    pub handler: Arc<dyn EventListener>,
    pub priority: i32,
    pub once: bool,
    pub namespace: Option<String>,
    pub created_at: Instant,
    /// Per-listener override of the stale-age threshold.
    pub stale_after: Option<Duration>,
}

/// Snapshot entry handed to the dispatch loop.
///
/// Holds everything `emit` needs so the registry lock is released before
/// any handler runs.
pub(crate) struct DispatchEntry {
    pub id: ListenerId,
    pub handler: Arc<dyn EventListener>,
    pub once: bool,
}

/// Per-event listener lists, each sorted by priority descending.
///
/// The registry does not retain empty lists: removing the last listener
/// for a name deletes the name's entry entirely.
pub(crate) struct Registry {
    listeners: HashMap<String, Vec<ListenerRecord>>,
    max_per_event: usize,
}

impl Registry {
    pub fn new(max_per_event: usize) -> Self {
        Self {
            listeners: HashMap::new(),
            max_per_event,
        }
    }

    /// Inserts a listener, keeping the list priority-descending.
    ///
    /// Stable for equal priorities: the new listener lands after existing
    /// listeners of the same priority, so insertion order breaks ties.
    pub fn insert(
        &mut self,
        event: &str,
        handler: Arc<dyn EventListener>,
        opts: &SubscribeOptions,
    ) -> Result<ListenerId, BusError> {
        let entry = self.listeners.entry(event.to_string()).or_default();
        if entry.len() >= self.max_per_event {
            return Err(BusError::CapacityExceeded {
                event: event.to_string(),
                limit: self.max_per_event,
            });
        }

        let record = ListenerRecord {
            id: ListenerId::new(),
            handler,
            priority: opts.priority,
            once: opts.once,
            namespace: opts.namespace.clone(),
            created_at: Instant::now(),
            stale_after: opts.stale_after,
        };
        let id = record.id;

        let pos = entry
            .iter()
            .position(|r| r.priority < record.priority)
            .unwrap_or(entry.len());
        entry.insert(pos, record);

        Ok(id)
    }

    /// Returns the dispatch snapshot for an event name, in priority order.
    pub fn snapshot(&self, event: &str) -> Vec<DispatchEntry> {
        self.listeners
            .get(event)
            .map(|records| {
                records
                    .iter()
                    .map(|r| DispatchEntry {
                        id: r.id,
                        handler: Arc::clone(&r.handler),
                        once: r.once,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes a single listener. Returns `true` if found.
    pub fn remove(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(records) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        let removed = records.len() < before;
        if records.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Removes all listeners for an event name. Returns the count removed.
    pub fn remove_all(&mut self, event: &str) -> usize {
        self.listeners.remove(event).map_or(0, |v| v.len())
    }

    /// Removes listeners matching every supplied filter criterion.
    ///
    /// Returns the count removed. An empty filter removes nothing.
    pub fn remove_filtered(&mut self, filter: &ListenerFilter) -> usize {
        if filter.is_empty() {
            return 0;
        }
        let mut removed = 0;
        self.listeners.retain(|event, records| {
            let name_matches = filter
                .pattern
                .as_ref()
                .map_or(true, |pattern| pattern.matches(event));
            if name_matches {
                let before = records.len();
                records.retain(|r| {
                    let ns_match = filter
                        .namespace
                        .as_ref()
                        .map_or(true, |ns| r.namespace.as_deref() == Some(ns.as_str()));
                    let prio_match = filter.priority.map_or(true, |p| r.priority == p);
                    !(ns_match && prio_match)
                });
                removed += before - records.len();
            }
            !records.is_empty()
        });
        removed
    }

    /// Removes listeners older than their stale threshold.
    ///
    /// `max_age` applies to listeners without a per-listener override.
    pub fn remove_stale(&mut self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.listeners.retain(|_, records| {
            let before = records.len();
            records.retain(|r| {
                let threshold = r.stale_after.unwrap_or(max_age);
                now.duration_since(r.created_at) <= threshold
            });
            removed += before - records.len();
            !records.is_empty()
        });
        removed
    }

    /// Total live listeners across all events.
    pub fn total(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// Listener count per event name.
    pub fn counts(&self) -> HashMap<String, usize> {
        self.listeners
            .iter()
            .map(|(name, records)| (name.clone(), records.len()))
            .collect()
    }

    /// Rough memory footprint of the registry bookkeeping.
    ///
    /// Counts record structs and key strings; handler captures are
    /// opaque and excluded. Good enough for the stats readout.
    pub fn approx_memory_bytes(&self) -> usize {
        self.listeners
            .iter()
            .map(|(name, records)| {
                name.len()
                    + records.len() * std::mem::size_of::<ListenerRecord>()
                    + records
                        .iter()
                        .map(|r| r.namespace.as_ref().map_or(0, String::len))
                        .sum::<usize>()
            })
            .sum()
    }
}
