//! Identifier types for the Holodesk event core.
//!
//! All identifiers are UUID v4 newtypes with a short `Display` prefix so
//! log lines stay readable (`lsn:…`, `mw:…`, `rec:…`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a registered bus listener.
///
/// Returned by `EventBus::subscribe` and required to target a single
/// listener for removal. Listener identity is the id alone — two
/// subscriptions of the same callback get distinct ids.
///
/// # Example
///
/// ```
/// use holo_types::ListenerId;
///
/// let id = ListenerId::new();
/// assert!(format!("{id}").starts_with("lsn:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub Uuid);

#[allow(clippy::new_without_default)] // Default intentionally not implemented - see below
impl ListenerId {
    /// Creates a new [`ListenerId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

// NOTE: ListenerId intentionally does NOT implement Default.
// Default::default() would mint an id that is not present in any registry,
// and unsubscribe calls with it silently match nothing. Ids come from
// EventBus::subscribe only.

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lsn:{}", self.0)
    }
}

/// Identifier for a registered middleware.
///
/// Returned by `MiddlewareExecutor::register`; used to unregister or
/// toggle a single registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MiddlewareId(pub Uuid);

#[allow(clippy::new_without_default)] // same rationale as ListenerId
impl MiddlewareId {
    /// Creates a new [`MiddlewareId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for MiddlewareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mw:{}", self.0)
    }
}

/// Identifier for a tracked lifecycle record.
///
/// A lifecycle record is a unit of work with status, retry and dependency
/// bookkeeping, distinct from a raw bus event. The id doubles as the
/// persistence key suffix, so it must survive serde round-trips intact.
///
/// # Example
///
/// ```
/// use holo_types::RecordId;
///
/// let id = RecordId::new();
/// let json = serde_json::to_string(&id).unwrap();
/// let restored: RecordId = serde_json::from_str(&json).unwrap();
/// assert_eq!(id, restored);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

#[allow(clippy::new_without_default)] // ids come from LifecycleManager::submit
impl RecordId {
    /// Creates a new [`RecordId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rec:{}", self.0)
    }
}
