//! In-memory store implementations.

use async_trait::async_trait;
use pulse_core::{KeyValueStore, Result, StatusStore, SyncStatusRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Key-value store kept in a `RwLock`-protected `HashMap`.
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(value) => {
                debug!("Store hit");
                Ok(Some(value.clone()))
            }
            None => {
                debug!("Store miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Sync status records kept in memory, one per source.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: RwLock<HashMap<String, SyncStatusRecord>>,
}

impl MemoryStatusStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    #[instrument(skip(self, record), fields(source = %record.source, status = %record.status))]
    async fn upsert(&self, record: &SyncStatusRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.source.clone(), record.clone());
        debug!("Stored sync status");
        Ok(())
    }

    async fn get(&self, source: &str) -> Result<Option<SyncStatusRecord>> {
        Ok(self.records.read().await.get(source).cloned())
    }

    async fn all(&self) -> Result<Vec<SyncStatusRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("a").await.unwrap().is_none());

        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().await, 1);

        store.delete("a").await.unwrap();
        assert!(store.is_empty().await);
        // Deleting again is fine.
        store.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        store.set("cache:x", "1").await.unwrap();
        store.set("cache:y", "2").await.unwrap();
        store.set("prefs:theme", "dark").await.unwrap();

        let mut keys = store.keys_with_prefix("cache:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["cache:x", "cache:y"]);
    }

    #[tokio::test]
    async fn test_status_store_upserts() {
        let store = MemoryStatusStore::new();
        let now = Utc::now();

        store
            .upsert(&SyncStatusRecord::in_progress("fx", now, now))
            .await
            .unwrap();
        store
            .upsert(&SyncStatusRecord::in_progress("fx", now, now).succeeded(3))
            .await
            .unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(store.get("fx").await.unwrap().unwrap().records_updated, 3);
        assert!(store.get("quotes").await.unwrap().is_none());
    }
}
