//! No-op store implementation.

use async_trait::async_trait;
use pulse_core::{KeyValueStore, Result, StatusStore, SyncStatusRecord};
use tracing::trace;

/// A store that doesn't keep anything.
///
/// Every read misses and every write succeeds. As the durable tier of a
/// [`TieredCache`](crate::TieredCache) it leaves the in-process tier as the
/// only copy: nothing survives a restart, and once a strict read evicts an
/// expired entry the lenient read misses too. The runtime uses
/// [`MemoryStore`](crate::MemoryStore) when no database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl NoopStore {
    /// Create a new no-op store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyValueStore for NoopStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        trace!("NoopStore: get called, returning None");
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        trace!("NoopStore: set called, doing nothing");
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        trace!("NoopStore: delete called, doing nothing");
        Ok(())
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl StatusStore for NoopStore {
    async fn upsert(&self, _record: &SyncStatusRecord) -> Result<()> {
        trace!("NoopStore: upsert called, doing nothing");
        Ok(())
    }

    async fn get(&self, _source: &str) -> Result<Option<SyncStatusRecord>> {
        Ok(None)
    }

    async fn all(&self) -> Result<Vec<SyncStatusRecord>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_store_reads_miss() {
        let store = NoopStore::new();
        KeyValueStore::set(&store, "k", "v").await.unwrap();
        assert!(KeyValueStore::get(&store, "k").await.unwrap().is_none());
        assert!(store.keys_with_prefix("").await.unwrap().is_empty());

        let record = SyncStatusRecord::pending("fx");
        store.upsert(&record).await.unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tiered_cache_over_noop_loses_evicted_entries() {
        use crate::TieredCache;
        use chrono::{TimeZone, Utc};
        use pulse_core::ManualClock;
        use std::sync::Arc;
        use std::time::Duration;

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap(),
        ));
        let cache = TieredCache::new(Arc::new(NoopStore::new()), clock.clone());
        cache.set("k", &vec![1], Duration::from_secs(60)).await.unwrap();
        assert!(cache.get_stale::<Vec<i32>>("k").await.is_some());

        clock.advance(Duration::from_secs(90));
        assert!(cache.get::<Vec<i32>>("k", None).await.is_none());
        assert!(cache.get_stale::<Vec<i32>>("k").await.is_none());
    }
}
