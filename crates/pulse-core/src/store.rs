//! Durable persistence surfaces.
//!
//! - [`KeyValueStore`] - string keys to string values, no transactions
//! - [`StatusStore`] - one [`SyncStatusRecord`] per source, upsert on conflict

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::Result, status::SyncStatusRecord};

/// Durable key-value storage backing the cache's second tier.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns the stored value, or `Ok(None)` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists every key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Durable storage for sync status records, keyed by source id.
#[async_trait]
pub trait StatusStore: Send + Sync + Debug {
    /// Inserts or replaces the record for `record.source`.
    async fn upsert(&self, record: &SyncStatusRecord) -> Result<()>;

    /// Returns the record for `source`, if any attempt was ever made.
    async fn get(&self, source: &str) -> Result<Option<SyncStatusRecord>>;

    /// Returns every stored record, in no particular order.
    async fn all(&self) -> Result<Vec<SyncStatusRecord>>;
}
