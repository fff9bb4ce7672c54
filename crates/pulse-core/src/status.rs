//! Sync schedule, status and freshness records.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    error::PulseError,
    frequency::SyncFrequency,
};

/// Static per-source schedule declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncScheduleEntry {
    /// Source id.
    pub source: String,
    /// Frequency class.
    pub frequency: SyncFrequency,
    /// Interval between scheduled runs.
    pub interval: Duration,
}

impl SyncScheduleEntry {
    /// Schedule `source` at its frequency's nominal interval.
    #[must_use]
    pub fn new(source: impl Into<String>, frequency: SyncFrequency) -> Self {
        Self {
            source: source.into(),
            frequency,
            interval: frequency.nominal_interval(),
        }
    }

    /// Overrides the interval while keeping the frequency class.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// `last_sync + interval`.
    #[must_use]
    pub fn next_after(&self, last_sync: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.interval)
            .ok()
            .and_then(|interval| last_sync.checked_add_signed(interval))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Outcome of the latest sync attempt for a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Last attempt succeeded.
    Success,
    /// Last attempt failed.
    Failed,
    /// Waiting for its next run, or rejected because another sync held the lock.
    Pending,
    /// Currently running.
    InProgress,
}

impl SyncStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            other => Err(PulseError::Parse(format!("Invalid sync status: {other}"))),
        }
    }
}

/// Latest sync state of one source. Only the most recent attempt is kept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusRecord {
    /// Source id.
    pub source: String,
    /// Start of the latest attempt.
    pub last_sync: Option<DateTime<Utc>>,
    /// When the next scheduled run is due.
    pub next_sync: Option<DateTime<Utc>>,
    /// Outcome of the latest attempt.
    pub status: SyncStatus,
    /// Records touched by the latest successful attempt.
    pub records_updated: usize,
    /// Error message of the latest failed attempt.
    pub error_message: Option<String>,
}

impl SyncStatusRecord {
    /// A record with no attempt made.
    #[must_use]
    pub fn pending(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            last_sync: None,
            next_sync: None,
            status: SyncStatus::Pending,
            records_updated: 0,
            error_message: None,
        }
    }

    /// A record for an attempt that just started.
    #[must_use]
    pub fn in_progress(
        source: impl Into<String>,
        last_sync: DateTime<Utc>,
        next_sync: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            last_sync: Some(last_sync),
            next_sync: Some(next_sync),
            status: SyncStatus::InProgress,
            records_updated: 0,
            error_message: None,
        }
    }

    /// Marks the attempt successful.
    #[must_use]
    pub fn succeeded(mut self, records_updated: usize) -> Self {
        self.status = SyncStatus::Success;
        self.records_updated = records_updated;
        self.error_message = None;
        self
    }

    /// Marks the attempt failed.
    #[must_use]
    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.status = SyncStatus::Failed;
        self.records_updated = 0;
        self.error_message = Some(error_message.into());
        self
    }
}

/// Fresh/stale label for a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Synced within its threshold.
    Fresh,
    /// Older than its threshold, or never synced.
    Stale,
}

impl Freshness {
    /// Display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freshness classification of one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FreshnessVerdict {
    /// Source id.
    pub source: String,
    /// Hours since the last sync; `None` when never synced.
    pub age_hours: Option<f64>,
    /// Classification against the frequency's threshold.
    pub classification: Freshness,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_after_adds_interval() {
        let entry = SyncScheduleEntry::new("fx", SyncFrequency::Hourly);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(entry.next_after(at), at + TimeDelta::hours(1));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            SyncStatus::Success,
            SyncStatus::Failed,
            SyncStatus::Pending,
            SyncStatus::InProgress,
        ] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("done".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_failed_clears_count() {
        let now = Utc::now();
        let record = SyncStatusRecord::in_progress("quotes", now, now)
            .succeeded(12)
            .failed("timeout");
        assert_eq!(record.status, SyncStatus::Failed);
        assert_eq!(record.records_updated, 0);
        assert_eq!(record.error_message.as_deref(), Some("timeout"));
    }
}
