//! Lifecycle persistence abstraction.
//!
//! The [`LifecycleStore`] trait is the manager's only view of durable
//! storage: an opaque key/value store with prefix listing. Any backend
//! satisfying it (file, browser storage bridge, database) is
//! acceptable; the crate ships [`MemoryStore`] and [`JsonFileStore`].

mod file;
mod memory;

pub use file::{default_store_path, JsonFileStore};
pub use memory::MemoryStore;

use holo_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No value for the key (only from operations that require one,
    /// such as `delete`).
    #[error("key not found: {0}")]
    NotFound(String),

    /// The key contains characters the backend cannot represent.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// I/O error during backend operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage directory creation failed.
    #[error("failed to create store directory: {path}")]
    DirectoryCreation {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Creates a NotFound error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STORE_NOT_FOUND",
            Self::InvalidKey(_) => "STORE_INVALID_KEY",
            Self::Io(_) => "STORE_IO",
            Self::DirectoryCreation { .. } => "STORE_DIRECTORY_CREATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Transient filesystem conditions may clear; bad keys won't.
        matches!(self, Self::Io(_) | Self::NotFound(_))
    }
}

/// Key/value persistence for lifecycle records.
///
/// Implementations must be thread-safe; the manager calls the store
/// from timer tasks as well as the submitting task. All operations are
/// async for I/O backends.
///
/// # Contract
///
/// - `get` of a missing key returns `Ok(None)`, not an error
/// - `delete` of a missing key returns [`StoreError::NotFound`]
/// - `keys(prefix)` returns every stored key starting with `prefix`
///   (pass `""` for all keys), in no particular order
#[async_trait::async_trait]
pub trait LifecycleStore: Send + Sync {
    /// Reads the value for a key.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key does not exist.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Lists stored keys with the given prefix.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
