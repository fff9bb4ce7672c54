//! SQLite-backed durable storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{KeyValueStore, PulseError, Result, StatusStore, SyncStatusRecord, observe};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// SQLite store for cache entries and sync status records.
///
/// Both surfaces share one database file so the status log and the durable
/// cache tier survive restarts together. Last writer wins; there are no
/// optimistic-concurrency checks.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| PulseError::Storage(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store; data is lost when it is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| PulseError::Storage(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| PulseError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sync_status (
                source TEXT PRIMARY KEY,
                last_sync TEXT,
                next_sync TEXT,
                status TEXT NOT NULL,
                records_updated INTEGER NOT NULL DEFAULT 0,
                error_message TEXT
            )",
            [],
        )
        .map_err(|e| PulseError::Storage(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
        value
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| PulseError::Parse(format!("Invalid timestamp {s}: {e}")))
            })
            .transpose()
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<RawStatus> {
        Ok(RawStatus {
            source: row.get(0)?,
            last_sync: row.get(1)?,
            next_sync: row.get(2)?,
            status: row.get(3)?,
            records_updated: row.get(4)?,
            error_message: row.get(5)?,
        })
    }
}

/// Row as stored, before timestamp and status parsing.
struct RawStatus {
    source: String,
    last_sync: Option<String>,
    next_sync: Option<String>,
    status: String,
    records_updated: i64,
    error_message: Option<String>,
}

impl RawStatus {
    fn into_record(self) -> Result<SyncStatusRecord> {
        Ok(SyncStatusRecord {
            source: self.source,
            last_sync: SqliteStore::parse_timestamp(self.last_sync)?,
            next_sync: SqliteStore::parse_timestamp(self.next_sync)?,
            status: self.status.parse()?,
            records_updated: usize::try_from(self.records_updated).unwrap_or_default(),
            error_message: self.error_message,
        })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| PulseError::Storage(e.to_string()))
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, updated_at],
        )
        .map_err(|e| PulseError::Storage(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .map_err(|e| PulseError::Storage(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        // substr comparison avoids LIKE wildcards inside the prefix.
        let mut stmt = conn
            .prepare("SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1")
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        rows.map(|r| r.map_err(|e| PulseError::Storage(e.to_string())))
            .collect()
    }
}

#[async_trait]
impl StatusStore for SqliteStore {
    #[instrument(skip(self, record), fields(source = %record.source, status = %record.status))]
    async fn upsert(&self, record: &SyncStatusRecord) -> Result<()> {
        let records_updated = i64::try_from(record.records_updated).unwrap_or(i64::MAX);
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        conn.execute(
            "INSERT INTO sync_status
             (source, last_sync, next_sync, status, records_updated, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(source) DO UPDATE SET
                last_sync = excluded.last_sync,
                next_sync = excluded.next_sync,
                status = excluded.status,
                records_updated = excluded.records_updated,
                error_message = excluded.error_message",
            params![
                record.source,
                record.last_sync.map(|t| t.to_rfc3339()),
                record.next_sync.map(|t| t.to_rfc3339()),
                record.status.as_str(),
                records_updated,
                record.error_message,
            ],
        )
        .map_err(|e| PulseError::Storage(e.to_string()))?;

        debug!("Stored sync status");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, source: &str) -> Result<Option<SyncStatusRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        let raw = conn
            .query_row(
                "SELECT source, last_sync, next_sync, status, records_updated, error_message
                 FROM sync_status WHERE source = ?1",
                params![source],
                Self::record_from_row,
            )
            .optional()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        raw.map(RawStatus::into_record).transpose()
    }

    #[instrument(skip(self))]
    async fn all(&self) -> Result<Vec<SyncStatusRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT source, last_sync, next_sync, status, records_updated, error_message
                 FROM sync_status",
            )
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::record_from_row)
            .map_err(|e| PulseError::Storage(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            // Skip unreadable rows.
            match row
                .map_err(|e| PulseError::Storage(e.to_string()))
                .and_then(RawStatus::into_record)
            {
                Ok(record) => records.push(record),
                Err(e) => observe::swallowed("sqlite.status", &e),
            }
        }
        debug!("Loaded {} sync status records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pulse_core::SyncStatus;

    #[tokio::test]
    async fn test_sqlite_store_initialization() {
        let store = SqliteStore::in_memory();
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_kv_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(KeyValueStore::get(&store, "k").await.unwrap().is_none());

        store.set("k", "{\"v\":1}").await.unwrap();
        store.set("k", "{\"v\":2}").await.unwrap();
        assert_eq!(
            KeyValueStore::get(&store, "k").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );

        store.delete("k").await.unwrap();
        assert!(KeyValueStore::get(&store, "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prefix_is_literal() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("pulse:cache:a", "1").await.unwrap();
        store.set("pulse:cache:b", "2").await.unwrap();
        store.set("pulse_cacheX", "3").await.unwrap();
        store.set("other", "4").await.unwrap();

        let mut keys = store.keys_with_prefix("pulse:cache:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["pulse:cache:a", "pulse:cache:b"]);
        // '_' must not act as a wildcard.
        assert_eq!(store.keys_with_prefix("pulse_").await.unwrap(), vec!["pulse_cacheX"]);
    }

    #[tokio::test]
    async fn test_status_upsert_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        let last = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();

        store
            .upsert(&SyncStatusRecord::in_progress("quotes", last, next))
            .await
            .unwrap();
        store
            .upsert(&SyncStatusRecord::in_progress("quotes", last, next).failed("HTTP 503"))
            .await
            .unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);

        let record = StatusStore::get(&store, "quotes").await.unwrap().unwrap();
        assert_eq!(record.status, SyncStatus::Failed);
        assert_eq!(record.last_sync, Some(last));
        assert_eq!(record.next_sync, Some(next));
        assert_eq!(record.error_message.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn test_status_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!("pulse-status-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let store = SqliteStore::new(&path).unwrap();
            let record = SyncStatusRecord::pending("indicators");
            store.upsert(&record).await.unwrap();
        }
        let store = SqliteStore::new(&path).unwrap();
        let record = StatusStore::get(&store, "indicators").await.unwrap().unwrap();
        assert_eq!(record.status, SyncStatus::Pending);
        assert!(record.last_sync.is_none());
        drop(store);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_all_skips_unreadable_rows() {
        let store = SqliteStore::in_memory().unwrap();
        let last = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        store
            .upsert(&SyncStatusRecord::in_progress("quotes", last, next).succeeded(4))
            .await
            .unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO sync_status (source, last_sync, next_sync, status, records_updated, error_message)
                 VALUES ('fx', 'not-a-date', NULL, 'bogus', 0, NULL)",
                [],
            )
            .unwrap();

        let before = observe::swallowed_count();
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].source, "quotes");
        assert_eq!(all[0].status, SyncStatus::Success);
        assert!(observe::swallowed_count() > before);
    }
}
