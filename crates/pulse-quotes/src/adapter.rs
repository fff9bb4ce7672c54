//! Cached, market-hours gated quote feed.

use async_trait::async_trait;
use pulse_cache::{CachedFeed, MarketGate, Sourced, TieredCache};
use pulse_core::{Quote, QuoteProvider, Result, Symbol, SyncTask, Throttle};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::fallback::fallback_quotes;

/// How long live quotes stay fresh in the cache.
pub const QUOTE_TTL: Duration = Duration::from_secs(15 * 60);

/// Symbols refreshed by scheduled syncs unless overridden.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "^GSPC", "^IXIC", "^DJI", "^GSPTSE", "^BVSP", "^FTSE", "^GDAXI", "^FCHI", "^J203.JO",
    "^NSEI", "^HSI", "^N225", "^AXJO",
];

/// Quote source adapter.
///
/// Live calls are skipped while the gate's venues are closed; quotes would not
/// move anyway.
#[derive(Debug)]
pub struct QuoteAdapter {
    provider: Arc<dyn QuoteProvider>,
    feed: CachedFeed,
    default_symbols: Vec<Symbol>,
}

impl QuoteAdapter {
    /// Create an adapter over `provider`, gated by `gate`.
    #[must_use]
    pub fn new(provider: Arc<dyn QuoteProvider>, cache: Arc<TieredCache>, gate: MarketGate) -> Self {
        Self {
            provider,
            feed: CachedFeed::new("quotes", cache, Throttle::standard(), QUOTE_TTL)
                .with_market_gate(gate),
            default_symbols: DEFAULT_SYMBOLS.iter().copied().map(Symbol::new).collect(),
        }
    }

    /// Replace the throttle, e.g. to match a paid plan's quota.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.feed = self.feed.with_throttle(throttle);
        self
    }

    /// Symbols refreshed by [`SyncTask::sync`].
    #[must_use]
    pub fn with_default_symbols(mut self, symbols: Vec<Symbol>) -> Self {
        self.default_symbols = symbols;
        self
    }

    /// Cache key for a symbol set; order and case of the input do not matter.
    #[must_use]
    pub fn cache_key(symbols: &[Symbol]) -> String {
        let mut sorted: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();
        format!("quotes:{}", sorted.join(","))
    }

    /// Latest quotes for `symbols`: live, cached, stale or fallback. Never fails.
    pub async fn fetch(&self, symbols: &[Symbol]) -> Vec<Quote> {
        self.fetch_with_origin(symbols).await.into_data()
    }

    /// Like [`fetch`](Self::fetch), tagged with where the quotes came from.
    #[instrument(skip(self), fields(symbols = symbols.len()))]
    pub async fn fetch_with_origin(&self, symbols: &[Symbol]) -> Sourced<Vec<Quote>> {
        self.feed
            .fetch(
                &Self::cache_key(symbols),
                self.provider.is_configured(),
                |throttle| throttle.throttle(|| self.provider.fetch_quotes(symbols)),
                || fallback_quotes(symbols),
            )
            .await
    }

    /// Fetches `symbols` live and caches them.
    ///
    /// # Errors
    /// Returns the provider's error, or an error when it is unconfigured or
    /// returns no quotes. A closed market yields an empty result.
    pub async fn refresh(&self, symbols: &[Symbol]) -> Result<Vec<Quote>> {
        self.feed
            .refresh(
                &Self::cache_key(symbols),
                self.provider.is_configured(),
                |throttle| throttle.throttle(|| self.provider.fetch_quotes(symbols)),
            )
            .await
    }
}

#[async_trait]
impl SyncTask for QuoteAdapter {
    async fn sync(&self) -> Result<usize> {
        Ok(self.refresh(&self.default_symbols).await?.len())
    }
}
