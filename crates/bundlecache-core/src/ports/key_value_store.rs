//! Persistent key-value store port.
//!
//! The bundle registry is saved as one opaque blob per configured base
//! directory. The store never interprets the bytes.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a key-value store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage could not be reached or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The backing storage holds data in an unexpected format.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the persistent key-value store.
///
/// # Usage
///
/// ```ignore
/// let store: Arc<dyn KeyValueStorePort> = Arc::new(MemoryStore::new());
/// store.set("registry", b"{}").await?;
/// let bytes = store.get("registry").await?;
/// ```
#[async_trait]
pub trait KeyValueStorePort: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// A process-local store for tests and embedders without durable storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        store
    }

    /// Synchronous read, for assertions.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl KeyValueStorePort for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
