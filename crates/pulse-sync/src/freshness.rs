//! Fresh/stale classification of synced sources.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use pulse_core::{
    Freshness, FreshnessVerdict, PulseError, Result, SyncFrequency, SyncScheduleEntry, SyncStatus,
    SyncStatusRecord, clock::elapsed_between,
};
use std::collections::HashMap;

/// Classifies `source` by the age of its last sync against the threshold of
/// `frequency`. A source that never synced is stale with no age.
#[must_use]
pub fn classify(
    source: &str,
    frequency: SyncFrequency,
    last_sync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> FreshnessVerdict {
    let Some(last_sync) = last_sync else {
        return FreshnessVerdict {
            source: source.to_string(),
            age_hours: None,
            classification: Freshness::Stale,
        };
    };

    let age = elapsed_between(last_sync, now);
    let classification = if age > frequency.stale_after() {
        Freshness::Stale
    } else {
        Freshness::Fresh
    };
    FreshnessVerdict {
        source: source.to_string(),
        age_hours: Some(age.as_secs_f64() / 3600.0),
        classification,
    }
}

/// How a source is presented on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDisplay {
    /// Human-readable name.
    pub name: String,
    /// Frequency shown as a badge.
    pub frequency: SyncFrequency,
}

impl SourceDisplay {
    /// Create display metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, frequency: SyncFrequency) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }

    /// Frequency badge text.
    #[must_use]
    pub const fn badge(&self) -> &'static str {
        self.frequency.label()
    }
}

/// One source's status joined with its display metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessRow {
    /// Source id.
    pub source: String,
    /// Display name.
    pub display_name: String,
    /// Scheduled frequency.
    pub frequency: SyncFrequency,
    /// Outcome of the latest attempt; `Pending` if never attempted.
    pub status: SyncStatus,
    /// Start of the latest attempt.
    pub last_sync: Option<DateTime<Utc>>,
    /// Next scheduled run.
    pub next_sync: Option<DateTime<Utc>>,
    /// Records touched by the latest attempt.
    pub records_updated: usize,
    /// Error of the latest attempt, if it failed.
    pub error_message: Option<String>,
    /// Hours since the latest attempt.
    pub age_hours: Option<f64>,
    /// Fresh or stale.
    pub classification: Freshness,
}

/// Freshness of every scheduled source at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessBoard {
    generated_at: DateTime<Utc>,
    rows: Vec<FreshnessRow>,
}

impl FreshnessBoard {
    /// Builds one row per schedule entry, in schedule order.
    ///
    /// Sources without display metadata are shown under their id.
    #[must_use]
    pub fn build(
        schedule: &[SyncScheduleEntry],
        displays: &HashMap<String, SourceDisplay>,
        records: &[SyncStatusRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let rows = schedule
            .iter()
            .map(|entry| {
                let record = records.iter().find(|r| r.source == entry.source);
                let last_sync = record.and_then(|r| r.last_sync);
                let verdict = classify(&entry.source, entry.frequency, last_sync, now);
                let display_name = displays
                    .get(&entry.source)
                    .map_or_else(|| entry.source.clone(), |d| d.name.clone());

                FreshnessRow {
                    source: entry.source.clone(),
                    display_name,
                    frequency: entry.frequency,
                    status: record.map_or(SyncStatus::Pending, |r| r.status),
                    last_sync,
                    next_sync: record.and_then(|r| r.next_sync),
                    records_updated: record.map_or(0, |r| r.records_updated),
                    error_message: record.and_then(|r| r.error_message.clone()),
                    age_hours: verdict.age_hours,
                    classification: verdict.classification,
                }
            })
            .collect();

        Self {
            generated_at: now,
            rows,
        }
    }

    /// When the board was computed.
    #[must_use]
    pub const fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// All rows, in schedule order.
    #[must_use]
    pub fn rows(&self) -> &[FreshnessRow] {
        &self.rows
    }

    /// Ids of the stale sources.
    #[must_use]
    pub fn stale_sources(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.classification == Freshness::Stale)
            .map(|r| r.source.as_str())
            .collect()
    }

    /// Returns true if no source is stale.
    #[must_use]
    pub fn all_fresh(&self) -> bool {
        self.rows
            .iter()
            .all(|r| r.classification == Freshness::Fresh)
    }

    /// Renders the board as a `DataFrame`, one row per source.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be assembled.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let sources: Vec<&str> = self.rows.iter().map(|r| r.source.as_str()).collect();
        let names: Vec<&str> = self.rows.iter().map(|r| r.display_name.as_str()).collect();
        let frequencies: Vec<&str> = self.rows.iter().map(|r| r.frequency.label()).collect();
        let statuses: Vec<&str> = self.rows.iter().map(|r| r.status.as_str()).collect();
        let classifications: Vec<&str> = self
            .rows
            .iter()
            .map(|r| r.classification.as_str())
            .collect();
        let ages: Vec<Option<f64>> = self.rows.iter().map(|r| r.age_hours).collect();
        let last_syncs: Vec<Option<i64>> = self
            .rows
            .iter()
            .map(|r| r.last_sync.map(|t| t.timestamp_millis()))
            .collect();
        let records: Vec<i64> = self
            .rows
            .iter()
            .map(|r| i64::try_from(r.records_updated).unwrap_or(i64::MAX))
            .collect();
        let errors: Vec<Option<&str>> = self
            .rows
            .iter()
            .map(|r| r.error_message.as_deref())
            .collect();

        let df = DataFrame::new(vec![
            Column::new("source".into(), sources),
            Column::new("name".into(), names),
            Column::new("frequency".into(), frequencies),
            Column::new("status".into(), statuses),
            Column::new("freshness".into(), classifications),
            Column::new("age_hours".into(), ages),
            Column::new("last_sync".into(), last_syncs),
            Column::new("records_updated".into(), records),
            Column::new("error".into(), errors),
        ])
        .map_err(|e| PulseError::Other(e.to_string()))?;

        df.lazy()
            .with_column(col("last_sync").cast(DataType::Datetime(TimeUnit::Milliseconds, None)))
            .collect()
            .map_err(|e| PulseError::Other(e.to_string()))
    }
}
