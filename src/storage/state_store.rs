//! StateStore trait - pluggable key-value backend for learned state
//!
//! Beliefs, GP histories and wear filters are saved as JSON records:
//! - `belief/<session>`
//! - `gp/<session>`
//! - `wear/<tool_instance>`
//! - `feedback/<session>/<timestamp>` (append-only operator reports)
//!
//! Backends:
//! - `InMemoryStore`: tests and single-process runs
//! - `SledStore`: durable store in one sled tree

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::warn;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

/// Trait for pluggable state backends.
///
/// Implementations must be thread-safe: the service shares one store across
/// request threads.
pub trait StateStore: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns true when the key existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Keys and JSON helpers
// ============================================================================

pub fn belief_key(session_id: &str) -> String {
    format!("belief/{session_id}")
}

pub fn gp_key(session_id: &str) -> String {
    format!("gp/{session_id}")
}

pub fn wear_key(tool_instance_id: &str) -> String {
    format!("wear/{tool_instance_id}")
}

pub fn feedback_prefix(session_id: &str) -> String {
    format!("feedback/{session_id}/")
}

/// Zero-padded so lexical order is chronological. `sequence` keeps two
/// reports stamped in the same nanosecond apart.
pub fn feedback_key(session_id: &str, timestamp_nanos: i64, sequence: u64) -> String {
    format!("{}{timestamp_nanos:020}-{sequence:010}", feedback_prefix(session_id))
}

pub fn save_json<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.put(key, &bytes)
}

pub fn load_json<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string())),
        None => Ok(None),
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory store. Not durable: data is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        records.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

// ============================================================================
// Sled backend
// ============================================================================

/// Durable store backed by a named sled tree ("state").
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::with_db(db)
    }

    /// Throwaway database, removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db)
    }

    fn with_db(db: sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree("state")?;
        Ok(Self { db, tree })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl Drop for SledStore {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            warn!(error = %e, "Failed to flush state store on drop");
        }
    }
}

impl StateStore for SledStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.tree.insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.tree.remove(key.as_bytes())?.is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.tree
            .scan_prefix(prefix.as_bytes())
            .keys()
            .map(|k| {
                let k = k?;
                String::from_utf8(k.to_vec()).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
