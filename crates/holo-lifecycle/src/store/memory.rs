//! In-memory store.

use super::{LifecycleStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory key/value store.
///
/// No durability across process restarts — useful for tests and for
/// deployments that want lifecycle tracking without persistence.
/// Cloning shares the underlying map, so a "restarted" manager handed a
/// clone sees the same data, which is how recovery is exercised in
/// tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: std::sync::Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl LifecycleStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryStore::new();
        store.set("rec-1", "{}").await.unwrap();

        assert_eq!(store.get("rec-1").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.get("rec-2").await.unwrap(), None);

        store.delete("rec-1").await.unwrap();
        assert!(matches!(
            store.delete("rec-1").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn keys_filter_by_prefix() {
        let store = MemoryStore::new();
        store.set("rec-a", "1").await.unwrap();
        store.set("rec-b", "2").await.unwrap();
        store.set("other", "3").await.unwrap();

        let mut keys = store.keys("rec-").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["rec-a", "rec-b"]);
        assert_eq!(store.keys("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryStore::new();
        let view = store.clone();
        store.set("k", "v").await.unwrap();
        assert_eq!(view.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
