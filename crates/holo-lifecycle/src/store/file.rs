//! Local JSON file store.
//!
//! Each key is one file in a flat directory:
//!
//! ```text
//! ~/.holodesk/lifecycle/
//! ├── rec-550e8400-e29b-41d4-a716-446655440000.json
//! ├── rec-6ba7b810-9dad-11d1-80b4-00c04fd430c8.json
//! └── ...
//! ```

use super::{LifecycleStore, StoreError};
use std::path::PathBuf;
use tokio::fs;

/// File-per-key store with atomic writes (write temp, then rename).
///
/// Keys map directly to file names, so they are restricted to
/// filesystem-safe characters: ASCII alphanumerics, `-`, `_` and `.`.
/// The manager's default keys (`rec-<uuid>`) satisfy this.
///
/// # Example
///
/// ```no_run
/// use holo_lifecycle::{JsonFileStore, LifecycleStore};
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = JsonFileStore::new(PathBuf::from("/tmp/lifecycle"))?;
/// store.set("rec-1", "{\"status\":\"pending\"}").await?;
/// assert!(store.get("rec-1").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `base_path`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DirectoryCreation`] if the directory
    /// cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        if !base_path.exists() {
            std::fs::create_dir_all(&base_path).map_err(|source| {
                StoreError::DirectoryCreation {
                    path: base_path.clone(),
                    source,
                }
            })?;
        }
        Ok(Self { base_path })
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn validate(key: &str) -> Result<(), StoreError> {
        let safe = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if safe {
            Ok(())
        } else {
            Err(StoreError::InvalidKey(key.to_string()))
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!(".{key}.json.tmp"))
    }
}

#[async_trait::async_trait]
impl LifecycleStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::validate(key)?;
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::validate(key)?;
        let temp = self.temp_path(key);

        // Write to temp file first, then rename (atomic on most
        // filesystems) so readers never observe a half-written record.
        fs::write(&temp, value).await?;
        fs::rename(&temp, self.entry_path(key)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        Self::validate(key)?;
        let path = self.entry_path(key);
        if !path.exists() {
            return Err(StoreError::not_found(key));
        }
        fs::remove_file(&path).await?;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension() != Some(std::ffi::OsStr::new("json")) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Skip in-flight temp files
            if stem.starts_with('.') {
                continue;
            }
            if stem.starts_with(prefix) {
                keys.push(stem.to_string());
            }
        }

        Ok(keys)
    }
}

/// Returns the default lifecycle store path (`~/.holodesk/lifecycle`).
#[must_use]
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".holodesk")
        .join("lifecycle")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (JsonFileStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path().to_path_buf()).unwrap();
        (store, temp)
    }

    #[tokio::test]
    async fn set_and_get() {
        let (store, _temp) = test_store();
        store.set("rec-1", r#"{"status":"pending"}"#).await.unwrap();

        let value = store.get("rec-1").await.unwrap().unwrap();
        assert!(value.contains("pending"));
        assert_eq!(store.get("rec-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let (store, _temp) = test_store();
        store.set("rec-1", "old").await.unwrap();
        store.set("rec-1", "new").await.unwrap();
        assert_eq!(store.get("rec-1").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn delete_missing_errors() {
        let (store, _temp) = test_store();
        store.set("rec-1", "x").await.unwrap();
        store.delete("rec-1").await.unwrap();
        assert!(matches!(
            store.delete("rec-1").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn keys_by_prefix_skip_temp_files() {
        let (store, temp) = test_store();
        store.set("rec-a", "1").await.unwrap();
        store.set("rec-b", "2").await.unwrap();
        store.set("cfg-c", "3").await.unwrap();
        // Simulate a leftover temp file from a crashed write
        std::fs::write(temp.path().join(".rec-d.json.tmp"), "junk").unwrap();

        let mut keys = store.keys("rec-").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["rec-a", "rec-b"]);
    }

    #[tokio::test]
    async fn invalid_keys_rejected() {
        let (store, _temp) = test_store();
        for bad in ["", "../escape", "a/b", ".hidden"] {
            assert!(
                matches!(store.set(bad, "x").await, Err(StoreError::InvalidKey(_))),
                "key {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn default_path_is_under_home() {
        let path = default_store_path();
        assert!(path.ends_with("lifecycle") || path.to_str().is_some());
    }
}
