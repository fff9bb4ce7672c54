//! Trading calendar for the exchanges the dashboard covers.
//!
//! Pure computation over a static venue table and an instant: no I/O and no
//! state beyond the configuration. Sessions are a single `[open, close)` window
//! in venue-local time; windows crossing midnight are rejected on construction.

use chrono::{
    DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    clock::Clock,
    error::{PulseError, Result},
};

/// Static description of one trading venue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeCalendarEntry {
    /// Exchange code, uppercase (e.g. `NYSE`).
    pub code: String,
    /// Country the venue belongs to.
    pub country: String,
    /// Venue timezone.
    pub timezone: Tz,
    /// Local opening time (inclusive).
    pub open: NaiveTime,
    /// Local closing time (exclusive).
    pub close: NaiveTime,
    /// Whether Saturday and Sunday are trading days.
    pub weekend_trading: bool,
}

impl ExchangeCalendarEntry {
    /// Create a weekday-only venue.
    ///
    /// # Errors
    /// Returns [`PulseError::InvalidParameter`] when the timezone is not a known
    /// IANA name or when `open` is not strictly before `close`.
    pub fn new(
        code: impl Into<String>,
        country: impl Into<String>,
        timezone: &str,
        open: NaiveTime,
        close: NaiveTime,
    ) -> Result<Self> {
        let timezone: Tz = timezone
            .parse()
            .map_err(|e| PulseError::InvalidParameter(format!("timezone {timezone}: {e}")))?;
        let code = code.into().to_uppercase();
        if open >= close {
            return Err(PulseError::InvalidParameter(format!(
                "{code}: session {open}-{close} must not cross midnight"
            )));
        }
        Ok(Self {
            code,
            country: country.into(),
            timezone,
            open,
            close,
            weekend_trading: false,
        })
    }

    /// Mark Saturday and Sunday as trading days.
    #[must_use]
    pub const fn with_weekend_trading(mut self, weekend_trading: bool) -> Self {
        self.weekend_trading = weekend_trading;
        self
    }

    /// Returns true if the venue trades on this weekday.
    #[must_use]
    pub const fn trades_on(&self, weekday: Weekday) -> bool {
        self.weekend_trading || !matches!(weekday, Weekday::Sat | Weekday::Sun)
    }

    /// First trading day strictly after `date`.
    fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        for _ in 0..7 {
            day = day.checked_add_days(Days::new(1)).unwrap_or(day);
            if self.trades_on(day.weekday()) {
                break;
            }
        }
        day
    }

    /// Wall-clock time from `now` until the venue-local instant `target`.
    fn until(&self, now: DateTime<Utc>, local_now: NaiveDateTime, target: NaiveDateTime) -> Duration {
        let delta = match self.timezone.from_local_datetime(&target).earliest() {
            Some(at) => at.with_timezone(&Utc).signed_duration_since(now),
            // Target falls in a DST gap; local arithmetic is close enough.
            None => target.signed_duration_since(local_now),
        };
        delta.to_std().unwrap_or(Duration::ZERO)
    }

    /// Computes the venue's status at `now`.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> MarketStatus {
        let local = now.with_timezone(&self.timezone).naive_local();
        let today = local.date();
        let time = local.time();

        let (is_open, change_type, target) = if !self.trades_on(today.weekday()) {
            let next = self.next_trading_day(today);
            (false, ChangeType::Open, next.and_time(self.open))
        } else if time < self.open {
            (false, ChangeType::Open, today.and_time(self.open))
        } else if time < self.close {
            (true, ChangeType::Close, today.and_time(self.close))
        } else {
            let next = self.next_trading_day(today);
            (false, ChangeType::Open, next.and_time(self.open))
        };

        MarketStatus {
            exchange: self.code.clone(),
            country: self.country.clone(),
            is_open,
            time_until_change: self.until(now, local, target),
            change_type,
            local_time: local,
            next_event: change_type.label().to_string(),
        }
    }
}

/// Which transition comes next for a venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// The venue opens next.
    Open,
    /// The venue closes next.
    Close,
}

impl ChangeType {
    /// Human-readable event label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Open => "Opens",
            Self::Close => "Closes",
        }
    }
}

/// Derived open/closed state of a venue at one instant. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketStatus {
    /// Exchange code.
    pub exchange: String,
    /// Country of the venue.
    pub country: String,
    /// Whether the venue is in session.
    pub is_open: bool,
    /// Time until the next open or close.
    pub time_until_change: Duration,
    /// Which transition comes next.
    pub change_type: ChangeType,
    /// Current venue-local time.
    pub local_time: NaiveDateTime,
    /// Event label (`Opens`, `Closes`, or `Unknown` for unconfigured venues).
    pub next_event: String,
}

impl MarketStatus {
    /// Status reported for a code that is not configured.
    fn unknown(code: &str, now: DateTime<Utc>) -> Self {
        Self {
            exchange: code.to_uppercase(),
            country: "Unknown".to_string(),
            is_open: false,
            time_until_change: Duration::ZERO,
            change_type: ChangeType::Open,
            local_time: now.naive_utc(),
            next_event: "Unknown".to_string(),
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.time_until_change.as_secs() / 60;
        write!(
            f,
            "{} {} in {}h {}m",
            self.exchange,
            self.next_event,
            minutes / 60,
            minutes % 60
        )
    }
}

/// Venue table plus a clock.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    entries: Vec<ExchangeCalendarEntry>,
    clock: Arc<dyn Clock>,
}

impl TradingCalendar {
    /// Create a calendar over the given venues.
    #[must_use]
    pub fn new(entries: Vec<ExchangeCalendarEntry>, clock: Arc<dyn Clock>) -> Self {
        Self { entries, clock }
    }

    /// Create a calendar over [`default_exchanges`].
    #[must_use]
    pub fn with_default_exchanges(clock: Arc<dyn Clock>) -> Self {
        Self::new(default_exchanges(), clock)
    }

    /// Configured venues.
    #[must_use]
    pub fn exchanges(&self) -> &[ExchangeCalendarEntry] {
        &self.entries
    }

    /// Looks up a venue by code (case-insensitive).
    #[must_use]
    pub fn entry(&self, code: &str) -> Option<&ExchangeCalendarEntry> {
        self.entries
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(code))
    }

    /// Status of `code` right now.
    #[must_use]
    pub fn status(&self, code: &str) -> MarketStatus {
        self.status_at(code, self.clock.now())
    }

    /// Status of `code` at `now`. Unknown codes report closed.
    #[must_use]
    pub fn status_at(&self, code: &str, now: DateTime<Utc>) -> MarketStatus {
        match self.entry(code) {
            Some(entry) => entry.status_at(now),
            None => MarketStatus::unknown(code, now),
        }
    }

    /// Returns true if `code` is in session at `now`.
    #[must_use]
    pub fn is_open_at(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.status_at(code, now).is_open
    }

    /// Status of every configured venue right now.
    #[must_use]
    pub fn statuses(&self) -> Vec<MarketStatus> {
        let now = self.clock.now();
        self.entries.iter().map(|e| e.status_at(now)).collect()
    }

    /// Returns true if any configured venue is in session right now.
    #[must_use]
    pub fn any_open(&self) -> bool {
        self.any_open_at(self.clock.now())
    }

    /// Returns true if any configured venue is in session at `now`.
    #[must_use]
    pub fn any_open_at(&self, now: DateTime<Utc>) -> bool {
        self.entries.iter().any(|e| e.status_at(now).is_open)
    }
}

fn venue(
    code: &str,
    country: &str,
    timezone: Tz,
    open: (u32, u32),
    close: (u32, u32),
) -> Option<ExchangeCalendarEntry> {
    Some(ExchangeCalendarEntry {
        code: code.to_string(),
        country: country.to_string(),
        timezone,
        open: NaiveTime::from_hms_opt(open.0, open.1, 0)?,
        close: NaiveTime::from_hms_opt(close.0, close.1, 0)?,
        weekend_trading: false,
    })
}

/// Regular sessions of the venues covered by the dashboard.
///
/// Lunch breaks are ignored: a venue counts as open from its morning open to
/// its afternoon close.
#[must_use]
pub fn default_exchanges() -> Vec<ExchangeCalendarEntry> {
    use chrono_tz::{Africa, America, Asia, Australia, Europe};

    [
        venue("NYSE", "United States", America::New_York, (9, 30), (16, 0)),
        venue("NASDAQ", "United States", America::New_York, (9, 30), (16, 0)),
        venue("TSX", "Canada", America::Toronto, (9, 30), (16, 0)),
        venue("B3", "Brazil", America::Sao_Paulo, (10, 0), (17, 0)),
        venue("LSE", "United Kingdom", Europe::London, (8, 0), (16, 30)),
        venue("XETRA", "Germany", Europe::Berlin, (9, 0), (17, 30)),
        venue("EURONEXT", "France", Europe::Paris, (9, 0), (17, 30)),
        venue("JSE", "South Africa", Africa::Johannesburg, (9, 0), (17, 0)),
        venue("NSE", "India", Asia::Kolkata, (9, 15), (15, 30)),
        venue("HKEX", "Hong Kong", Asia::Hong_Kong, (9, 30), (16, 0)),
        venue("TSE", "Japan", Asia::Tokyo, (9, 0), (15, 0)),
        venue("ASX", "Australia", Australia::Sydney, (10, 0), (16, 0)),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Venue "X" trading 09:00-17:00 UTC, weekdays only.
    fn calendar_x() -> TradingCalendar {
        let entry = ExchangeCalendarEntry::new("X", "Testland", "UTC", hm(9, 0), hm(17, 0)).unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
        TradingCalendar::new(vec![entry], Arc::new(clock))
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_one_minute_before_open() {
        let cal = calendar_x();
        // Wednesday
        let status = cal.status_at("X", at(2024, 1, 10, 8, 59));
        assert!(!status.is_open);
        assert_eq!(status.next_event, "Opens");
        assert_eq!(status.change_type, ChangeType::Open);
        assert_eq!(status.time_until_change, Duration::from_millis(60_000));
    }

    #[test]
    fn test_open_is_inclusive() {
        let cal = calendar_x();
        let status = cal.status_at("X", at(2024, 1, 10, 9, 0));
        assert!(status.is_open);
        assert_eq!(status.next_event, "Closes");
        assert_eq!(status.time_until_change, Duration::from_secs(8 * 3600));
    }

    #[test]
    fn test_close_is_exclusive() {
        let cal = calendar_x();
        let status = cal.status_at("X", at(2024, 1, 10, 17, 0));
        assert!(!status.is_open);
        assert_eq!(status.change_type, ChangeType::Open);
        // Next open is Thursday 09:00.
        assert_eq!(status.time_until_change, Duration::from_secs(16 * 3600));
    }

    #[test]
    fn test_friday_close_skips_weekend() {
        let cal = calendar_x();
        // Friday 2024-01-12 18:00 -> Monday 2024-01-15 09:00.
        let status = cal.status_at("X", at(2024, 1, 12, 18, 0));
        assert!(!status.is_open);
        assert_eq!(status.time_until_change, Duration::from_secs(63 * 3600));
    }

    #[test]
    fn test_weekend_counts_to_monday_open() {
        let cal = calendar_x();
        // Saturday noon, inside what would be session hours.
        let status = cal.status_at("X", at(2024, 1, 13, 12, 0));
        assert!(!status.is_open);
        assert_eq!(status.next_event, "Opens");
        assert_eq!(status.time_until_change, Duration::from_secs(45 * 3600));
    }

    #[test]
    fn test_weekend_trading_venue() {
        let entry = ExchangeCalendarEntry::new("W", "Testland", "UTC", hm(9, 0), hm(17, 0))
            .unwrap()
            .with_weekend_trading(true);
        let status = entry.status_at(at(2024, 1, 13, 12, 0));
        assert!(status.is_open);
        // Saturday after close reopens Sunday.
        let status = entry.status_at(at(2024, 1, 13, 18, 0));
        assert_eq!(status.time_until_change, Duration::from_secs(15 * 3600));
    }

    #[test]
    fn test_unknown_exchange_is_closed() {
        let cal = calendar_x();
        let status = cal.status_at("NOPE", at(2024, 1, 10, 12, 0));
        assert!(!status.is_open);
        assert_eq!(status.country, "Unknown");
        assert_eq!(status.next_event, "Unknown");
    }

    #[test]
    fn test_nyse_respects_daylight_saving() {
        let clock = Arc::new(ManualClock::new(at(2024, 7, 1, 13, 30)));
        let cal = TradingCalendar::with_default_exchanges(clock.clone());
        // 13:30 UTC is 09:30 EDT in July.
        assert!(cal.status("NYSE").is_open);
        clock.set(at(2024, 7, 1, 13, 29));
        assert!(!cal.status("nyse").is_open);
        // In January EST applies: 14:30 UTC opens.
        assert!(!cal.is_open_at("NYSE", at(2024, 1, 10, 14, 29)));
        assert!(cal.is_open_at("NYSE", at(2024, 1, 10, 14, 30)));
    }

    #[test]
    fn test_any_open() {
        let cal = calendar_x();
        assert!(cal.any_open_at(at(2024, 1, 10, 12, 0)));
        assert!(!cal.any_open_at(at(2024, 1, 10, 20, 0)));
        assert!(!cal.any_open());
    }

    #[test]
    fn test_rejects_midnight_crossing() {
        let result = ExchangeCalendarEntry::new("N", "Testland", "UTC", hm(22, 0), hm(2, 0));
        assert!(matches!(result, Err(PulseError::InvalidParameter(_))));
    }

    #[test]
    fn test_default_table_is_complete() {
        let exchanges = default_exchanges();
        assert_eq!(exchanges.len(), 12);
        assert!(exchanges.iter().all(|e| e.open < e.close));
    }
}
