//! Per-iteration snapshot persistence.
//!
//! Every successful tick writes exactly two records to the external
//! key-value store, in this order:
//!
//! | Key | Value |
//! |-----|-------|
//! | `{sim_id}-{iteration}-state` | JSON population map |
//! | `{sim_id}-{iteration}-update` | JSON updates map |
//!
//! The store itself sits behind [`KeyValueStore`] so the tick loop does
//! not care whether it talks to Redis or to the in-process
//! [`MemoryStore`].

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

/// Key suffix of the full-population record.
pub const STATE_SUFFIX: &str = "state";

/// Key suffix of the per-tick updates record.
pub const UPDATE_SUFFIX: &str = "update";

/// Errors reported by a [`KeyValueStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend refused or failed the write.
    #[error("write to {key} failed: {reason}")]
    Write {
        /// Key that was being written.
        key: String,
        /// Backend-specific description.
        reason: String,
    },
}

/// Errors that can occur while persisting a tick record.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The value could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store rejected the write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Minimal key-value contract consumed by the tick loop.
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Build the persisted key for a record.
pub fn record_key(sim_id: &str, iteration: u64, suffix: &str) -> String {
    format!("{sim_id}-{iteration}-{suffix}")
}

/// Writes tick records under keys prefixed by the simulation ID.
#[derive(Debug, Clone)]
pub struct SnapshotPersister<S> {
    sim_id: String,
    store: S,
}

impl<S: KeyValueStore> SnapshotPersister<S> {
    /// Create a persister for `sim_id` backed by `store`.
    pub const fn new(sim_id: String, store: S) -> Self {
        Self { sim_id, store }
    }

    /// Return the simulation ID prefix.
    pub fn sim_id(&self) -> &str {
        &self.sim_id
    }

    /// Return the underlying store.
    pub const fn backend(&self) -> &S {
        &self.store
    }

    /// Serialize `value` as JSON and write it under
    /// `{sim_id}-{iteration}-{suffix}`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Serialization`] if encoding fails, or
    /// [`PersistError::Store`] if the backend write fails.
    pub async fn store<T>(&self, suffix: &str, iteration: u64, value: &T) -> Result<(), PersistError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let key = record_key(&self.sim_id, iteration, suffix);
        let bytes = serde_json::to_vec(value)?;
        let len = bytes.len();
        self.store.set(&key, bytes).await?;
        tracing::debug!(key = %key, bytes = len, "Stored tick record");
        Ok(())
    }
}

/// In-process [`KeyValueStore`] backed by a shared map.
///
/// Clones share the same contents. Besides the current values it keeps
/// the order in which keys were written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: BTreeMap<String, Vec<u8>>,
    writes: Vec<String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored keys in lexical order.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.lock().await.values.keys().cloned().collect()
    }

    /// Every key written so far, in write order (repeats included).
    pub async fn write_log(&self) -> Vec<String> {
        self.inner.lock().await.writes.clone()
    }

    /// Value stored at `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().await.values.get(key).cloned()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.values.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.writes.push(key.to_owned());
        inner.values.insert(key.to_owned(), value);
        Ok(())
    }
}
