#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pulse/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the pulse data-freshness layer.
//!
//! - [`TradingCalendar`](calendar::TradingCalendar) - Exchange open/closed state
//! - [`Throttle`](throttle::Throttle) - Minimum spacing between outbound calls
//! - [`KeyValueStore`](store::KeyValueStore) / [`StatusStore`](store::StatusStore) - Durable storage
//! - [`QuoteProvider`](provider::QuoteProvider), [`FxRateProvider`](provider::FxRateProvider),
//!   [`IndicatorProvider`](provider::IndicatorProvider) - Remote feeds
//! - [`SyncTask`](provider::SyncTask) - Work scheduled by the orchestrator

/// Trading calendar for the covered exchanges.
pub mod calendar;
/// Injectable wall-clock time.
pub mod clock;
/// Error types.
pub mod error;
/// Sync frequency classes.
pub mod frequency;
/// Reporting hook for swallowed errors.
pub mod observe;
/// Remote feed traits.
pub mod provider;
/// Sync schedule, status and freshness records.
pub mod status;
/// Durable storage traits.
pub mod store;
/// Outbound call throttling.
pub mod throttle;
/// Feed value types (Symbol, Quote, FxRate, Indicator).
pub mod types;

// Re-export commonly used items at crate root
pub use calendar::{ChangeType, ExchangeCalendarEntry, MarketStatus, TradingCalendar};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PulseError, Result};
pub use frequency::SyncFrequency;
pub use provider::{DataProvider, FxRateProvider, IndicatorProvider, QuoteProvider, SyncTask};
pub use status::{Freshness, FreshnessVerdict, SyncScheduleEntry, SyncStatus, SyncStatusRecord};
pub use store::{KeyValueStore, StatusStore};
pub use throttle::Throttle;
pub use types::{FxRate, Indicator, Quote, Symbol};
