//! Key-value persistence slots.
//!
//! A [`StorageSlot`] is the durable home of a serialized collection. Values are
//! opaque strings; callers own the encoding. Two implementations ship here:
//!
//! - [`MemoryStorage`] - process-local map, used by tests and ephemeral tabs
//! - [`FileStorage`] - one JSON file per key under a directory

mod file;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

pub use file::FileStorage;

/// Storage failures. None of these are fatal to a store: the in-memory state
/// stays authoritative and the failure is logged.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on storage key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage unavailable")]
    Unavailable,

    #[error("Storage quota exceeded for key '{0}'")]
    QuotaExceeded(String),
}

/// A durable string slot addressed by key.
pub trait StorageSlot: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the delete.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail with `QuotaExceeded`.
    pub fn set_quota_exceeded(&self, exceeded: bool) {
        self.reject_writes.store(exceeded, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.values.lock().map_err(|_| StorageError::Unavailable)
    }
}

impl StorageSlot for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded(key.to_string()));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
