//! Persistent key-value storage.
//!
//! A synchronous, string-to-string store shared by the email caches and the
//! token stores. Three backends are provided:
//! - [`MemoryStore`]: process-local, optional byte quota
//! - [`FileStore`]: one JSON document on disk
//! - [`KeyringStore`]: the platform credential store, for token records

mod file;
mod keyring;
mod memory;

pub use file::FileStore;
pub use keyring::KeyringStore;
pub use memory::MemoryStore;

use std::sync::Arc;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing would exceed the backend's capacity.
    #[error("Storage quota exceeded: {needed} bytes needed, {limit} bytes allowed")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Configured capacity.
        limit: usize,
    },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Platform keyring failure.
    #[error("Keyring error: {0}")]
    Keyring(#[from] ::keyring::Error),

    /// A previous holder of the store lock panicked.
    #[error("Storage lock poisoned")]
    Poisoned,

    /// Operation not supported by this backend.
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the removal.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Stores several entries. Backends that persist on every write
    /// override this to persist once.
    ///
    /// # Errors
    ///
    /// Returns the first write error. Entries before it may have been stored.
    fn set_many(&self, entries: &[(String, String)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Lists every stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot enumerate keys.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Removes every key starting with `prefix` and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if enumeration or a removal fails.
    fn remove_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let mut removed = 0;
        for key in self.keys()? {
            if key.starts_with(prefix) {
                self.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Shared storage handle.
pub type SharedStore = Arc<dyn KeyValueStore>;

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.as_ref().get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.as_ref().set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.as_ref().remove(key)
    }

    fn set_many(&self, entries: &[(String, String)]) -> StorageResult<()> {
        self.as_ref().set_many(entries)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.as_ref().keys()
    }

    fn remove_prefix(&self, prefix: &str) -> StorageResult<usize> {
        self.as_ref().remove_prefix(prefix)
    }
}
