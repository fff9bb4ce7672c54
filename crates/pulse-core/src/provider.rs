//! Remote feed traits.
//!
//! - [`DataProvider`] - Base trait for all remote feeds
//! - [`QuoteProvider`] - Latest quotes for a batch of symbols
//! - [`FxRateProvider`] - Currency exchange rates
//! - [`IndicatorProvider`] - Yearly macro indicators per country
//! - [`SyncTask`] - Work unit the sync orchestrator schedules

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{FxRate, Indicator, Quote, Symbol},
};

/// Base trait for all remote feeds.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "FMP").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;

    /// Returns false when a required credential is missing.
    ///
    /// Adapters over an unconfigured provider serve cache and fallback data only.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Provider of latest quotes.
#[async_trait]
pub trait QuoteProvider: DataProvider {
    /// Fetches the latest quote for each symbol in one request.
    ///
    /// Symbols the feed does not know are omitted from the result.
    async fn fetch_quotes(&self, symbols: &[Symbol]) -> Result<Vec<Quote>>;
}

/// Provider of currency exchange rates.
#[async_trait]
pub trait FxRateProvider: DataProvider {
    /// Fetches the rate for one currency pair.
    ///
    /// Callers fetching several pairs go through a throttle per request; see
    /// the FX adapter.
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<FxRate>;
}

/// Provider of macro-economic indicators.
#[async_trait]
pub trait IndicatorProvider: DataProvider {
    /// Fetches yearly observations of `code` for each country.
    async fn fetch_indicators(&self, countries: &[String], code: &str) -> Result<Vec<Indicator>>;
}

/// A source the sync orchestrator can run.
#[async_trait]
pub trait SyncTask: Send + Sync + Debug {
    /// Refreshes the source from its remote feed.
    ///
    /// Returns the number of records touched.
    async fn sync(&self) -> Result<usize>;
}
