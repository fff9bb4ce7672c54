//! Sync frequency classes and their staleness thresholds.
//!
//! This module defines [`SyncFrequency`], the cadence a source is scheduled at,
//! and the thresholds used to classify its data as fresh or stale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// How often a source is expected to sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncFrequency {
    /// Once an hour.
    Hourly,
    /// Once a day.
    Daily,
    /// Once a week.
    Weekly,
    /// Once a month (30 days).
    Monthly,
}

impl SyncFrequency {
    /// All frequency classes, shortest first.
    pub const ALL: [Self; 4] = [Self::Hourly, Self::Daily, Self::Weekly, Self::Monthly];

    /// The nominal interval between two syncs.
    #[must_use]
    pub const fn nominal_interval(&self) -> Duration {
        match self {
            Self::Hourly => Duration::from_secs(HOUR),
            Self::Daily => Duration::from_secs(DAY),
            Self::Weekly => Duration::from_secs(7 * DAY),
            Self::Monthly => Duration::from_secs(30 * DAY),
        }
    }

    /// Age after which data synced at this frequency is considered stale.
    ///
    /// These are fixed per class and deliberately not derived from one formula:
    /// hourly tolerates two missed runs, daily a flat 48 hours, weekly and
    /// monthly half an interval of slack.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        match self {
            Self::Hourly => Duration::from_secs(2 * HOUR),
            Self::Daily => Duration::from_secs(48 * HOUR),
            Self::Weekly => Duration::from_secs(7 * DAY + 7 * DAY / 2),
            Self::Monthly => Duration::from_secs(45 * DAY),
        }
    }

    /// Short badge label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for SyncFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_thresholds() {
        assert_eq!(
            SyncFrequency::Hourly.stale_after(),
            SyncFrequency::Hourly.nominal_interval() * 2
        );
        assert_eq!(
            SyncFrequency::Daily.stale_after(),
            Duration::from_secs(48 * 3600)
        );
        assert_eq!(
            SyncFrequency::Weekly.stale_after().as_secs(),
            SyncFrequency::Weekly.nominal_interval().as_secs() * 3 / 2
        );
    }

    #[test]
    fn test_display_matches_label() {
        for freq in SyncFrequency::ALL {
            assert_eq!(freq.to_string(), freq.label());
        }
    }
}
