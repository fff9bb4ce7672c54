//! Two-tier cache: in-process map over a durable key-value store.
//!
//! The in-process tier is authoritative for the session and is consulted
//! first; a durable hit backfills it. Entries are stored as JSON so the durable
//! tier can hold any serde type. Durable failures never fail a cache call:
//! they are reported through [`pulse_core::observe::swallowed`] and the
//! in-process tier carries on alone.

use chrono::{DateTime, TimeDelta, Utc};
use pulse_core::{Clock, KeyValueStore, PulseError, Result, clock::elapsed_between, observe};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Prefix of every durable key owned by the cache.
pub const CACHE_PREFIX: &str = "pulse:cache:";

/// A cached value with its capture and expiry instants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Cached value.
    pub data: T,
    /// When the value was stored.
    pub captured_at: DateTime<Utc>,
    /// When strict reads stop returning the value.
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            data,
            captured_at: now,
            expires_at: TimeDelta::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns true once `now` is past the expiry instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time since capture.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        elapsed_between(self.captured_at, now)
    }
}

/// Result of a lenient read.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleRead<T> {
    /// Cached value, possibly expired.
    pub data: T,
    /// Time since the value was captured.
    pub age: Duration,
}

/// In-process cache backed by a durable store.
#[derive(Debug)]
pub struct TieredCache {
    memory: RwLock<HashMap<String, CacheEntry<Value>>>,
    durable: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl TieredCache {
    /// Create a cache over `durable`, reading time from `clock`.
    #[must_use]
    pub fn new(durable: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            durable,
            clock,
        }
    }

    fn durable_key(key: &str) -> String {
        format!("{CACHE_PREFIX}{key}")
    }

    /// Stores `data` in both tiers for `ttl`.
    ///
    /// # Errors
    /// Returns [`PulseError::Parse`] if `data` cannot be serialized. A failed
    /// durable write is reported and swallowed.
    #[instrument(skip(self, data))]
    pub async fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> Result<()> {
        let value = serde_json::to_value(data).map_err(|e| PulseError::Parse(e.to_string()))?;
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        let json = serde_json::to_string(&entry).map_err(|e| PulseError::Parse(e.to_string()))?;

        self.memory.write().await.insert(key.to_string(), entry);

        if let Err(e) = self.durable.set(&Self::durable_key(key), &json).await {
            observe::swallowed("cache.set", &e);
        }
        debug!("Cached entry");
        Ok(())
    }

    /// Loads the raw entry, backfilling memory from durable storage.
    async fn load(&self, key: &str) -> Option<CacheEntry<Value>> {
        if let Some(entry) = self.memory.read().await.get(key) {
            return Some(entry.clone());
        }

        let json = match self.durable.get(&Self::durable_key(key)).await {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                observe::swallowed("cache.load", &e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry<Value>>(&json) {
            Ok(entry) => {
                debug!(key, "Backfilled in-process tier from durable storage");
                self.memory
                    .write()
                    .await
                    .insert(key.to_string(), entry.clone());
                Some(entry)
            }
            Err(e) => {
                observe::swallowed("cache.load", &PulseError::Parse(e.to_string()));
                None
            }
        }
    }

    fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(key, error = %e, "Cached entry has a different shape");
                None
            }
        }
    }

    /// Strict read.
    ///
    /// Returns `None` if the entry is absent, older than `max_age`, or expired.
    /// An expired entry is evicted from the in-process tier; the durable copy
    /// stays as the last known value for lenient reads until [`delete`](Self::delete)
    /// or [`clear`](Self::clear).
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str, max_age: Option<Duration>) -> Option<T> {
        let entry = self.load(key).await?;
        let now = self.clock.now();

        if entry.is_expired(now) {
            debug!("Evicting expired entry from the in-process tier");
            self.memory.write().await.remove(key);
            return None;
        }
        if max_age.is_some_and(|max| entry.age(now) > max) {
            debug!("Entry older than max age");
            return None;
        }
        Self::decode(key, entry.data)
    }

    /// Lenient read: the entry and its age, regardless of expiry.
    #[instrument(skip(self))]
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<StaleRead<T>> {
        let entry = self.load(key).await?;
        let age = entry.age(self.clock.now());
        Self::decode(key, entry.data).map(|data| StaleRead { data, age })
    }

    /// Removes `key` from both tiers.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) {
        self.memory.write().await.remove(key);
        if let Err(e) = self.durable.delete(&Self::durable_key(key)).await {
            observe::swallowed("cache.delete", &e);
        }
    }

    /// Removes every cache-owned entry. Other keys in the durable store are kept.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.memory.write().await.clear();

        let keys = match self.durable.keys_with_prefix(CACHE_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                observe::swallowed("cache.clear", &e);
                return;
            }
        };
        for key in &keys {
            if let Err(e) = self.durable.delete(key).await {
                observe::swallowed("cache.clear", &e);
            }
        }
        debug!("Cleared {} durable cache entries", keys.len());
    }

    /// Returns true if a strict read with `max_age` would hit.
    pub async fn is_fresh(&self, key: &str, max_age: Duration) -> bool {
        self.get::<Value>(key, Some(max_age)).await.is_some()
    }

    /// Age of the entry, expired or not.
    pub async fn age(&self, key: &str) -> Option<Duration> {
        let entry = self.load(key).await?;
        Some(entry.age(self.clock.now()))
    }

    /// Age in milliseconds, or `-1` when the entry is absent.
    pub async fn age_millis(&self, key: &str) -> i64 {
        match self.age(key).await {
            Some(age) => i64::try_from(age.as_millis()).unwrap_or(i64::MAX),
            None => -1,
        }
    }
}
