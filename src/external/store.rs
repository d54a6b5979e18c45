//! Persistent JSON-blob store (spec.md §1 Non-goals / §6 "Persistent
//! state"): out of scope as a concrete implementation — only the
//! interface the core consumes matters. Grounded in the teacher's
//! `Database`/entity-repository split, but collapsed to a single narrow
//! async trait since the core only ever reads/writes opaque JSON blobs
//! under a collection+key, never structured rows.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable")]
    Unavailable,
    #[error("blob not found")]
    NotFound,
}

/// The persistence contract the core depends on: game profiles, login
/// history, starter loadouts, server ratings, matchmaker diagnostic
/// snapshots, and EULA/documents (spec.md §6).
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_blob(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;
    async fn put_blob(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError>;
}

/// In-memory double used in tests and for local development, mirroring
/// the teacher's pattern of keeping a trivial in-process fallback
/// alongside the real backend (`database`'s SQLite default).
#[derive(Default)]
pub struct InMemoryStore {
    blobs: parking_lot::RwLock<std::collections::HashMap<(String, String), Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_blob(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .blobs
            .read()
            .get(&(collection.to_string(), key.to_string()))
            .cloned())
    }

    async fn put_blob(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.blobs
            .write()
            .insert((collection.to_string(), key.to_string()), value);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_roundtrip() {
        let store = InMemoryStore::new();
        store
            .put_blob("GameProfiles", "gameProfile:OVR-1", serde_json::json!({"level": 5}))
            .await
            .unwrap();
        let value = store.get_blob("GameProfiles", "gameProfile:OVR-1").await.unwrap();
        assert_eq!(value, Some(serde_json::json!({"level": 5})));
    }

    #[tokio::test]
    async fn test_missing_blob_is_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_blob("GameProfiles", "missing").await.unwrap(), None);
    }
}
