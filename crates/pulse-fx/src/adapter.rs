//! Cached exchange-rate feed.

use async_trait::async_trait;
use pulse_cache::{CachedFeed, Sourced, TieredCache};
use pulse_core::{FxRate, FxRateProvider, PulseError, Result, SyncTask, Throttle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::fallback::fallback_rates;

/// How long live rates stay fresh in the cache.
pub const FX_TTL: Duration = Duration::from_secs(60 * 60);

/// Base currency refreshed by scheduled syncs unless overridden.
pub const DEFAULT_BASE: &str = "USD";

/// Quote currencies refreshed by scheduled syncs unless overridden.
pub const DEFAULT_QUOTES: &[&str] = &["CAD", "BRL", "GBP", "EUR", "ZAR", "INR", "HKD", "JPY", "AUD"];

/// Exchange-rate source adapter.
///
/// Currency markets trade around the clock, so there is no market gate. Each
/// pair is a separate request, spaced by the strict-quota throttle.
#[derive(Debug)]
pub struct FxAdapter {
    provider: Arc<dyn FxRateProvider>,
    feed: CachedFeed,
    default_base: String,
    default_quotes: Vec<String>,
}

impl FxAdapter {
    /// Create an adapter over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn FxRateProvider>, cache: Arc<TieredCache>) -> Self {
        Self {
            provider,
            feed: CachedFeed::new("fx", cache, Throttle::strict_quota(), FX_TTL),
            default_base: DEFAULT_BASE.to_string(),
            default_quotes: DEFAULT_QUOTES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replace the throttle, e.g. for a premium key.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.feed = self.feed.with_throttle(throttle);
        self
    }

    /// Pairs refreshed by [`SyncTask::sync`].
    #[must_use]
    pub fn with_defaults(mut self, base: impl Into<String>, quotes: Vec<String>) -> Self {
        self.default_base = base.into();
        self.default_quotes = quotes;
        self
    }

    /// Cache key for a base and quote set; order and case do not matter.
    #[must_use]
    pub fn cache_key(base: &str, quotes: &[String]) -> String {
        let mut sorted: Vec<String> = quotes.iter().map(|q| q.to_uppercase()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        format!("fx:{}:{}", base.to_uppercase(), sorted.join(","))
    }

    /// Rates from `base` into each of `quotes`. Never fails.
    pub async fn fetch(&self, base: &str, quotes: &[String]) -> Vec<FxRate> {
        self.fetch_with_origin(base, quotes).await.into_data()
    }

    /// Like [`fetch`](Self::fetch), tagged with where the rates came from.
    #[instrument(skip(self, quotes), fields(pairs = quotes.len()))]
    pub async fn fetch_with_origin(&self, base: &str, quotes: &[String]) -> Sourced<Vec<FxRate>> {
        self.feed
            .fetch(
                &Self::cache_key(base, quotes),
                self.provider.is_configured(),
                |throttle| self.live(throttle, base, quotes),
                || fallback_rates(base, quotes),
            )
            .await
    }

    /// Fetches every pair live and caches the result.
    ///
    /// # Errors
    /// Returns the first request error other than an unknown or empty pair,
    /// or an error when the provider is unconfigured or nothing came back.
    pub async fn refresh(&self, base: &str, quotes: &[String]) -> Result<Vec<FxRate>> {
        self.feed
            .refresh(
                &Self::cache_key(base, quotes),
                self.provider.is_configured(),
                |throttle| self.live(throttle, base, quotes),
            )
            .await
    }

    async fn live(&self, throttle: &Throttle, base: &str, quotes: &[String]) -> Result<Vec<FxRate>> {
        let mut rates = Vec::with_capacity(quotes.len());
        for quote in quotes {
            if quote.eq_ignore_ascii_case(base) {
                continue;
            }
            match throttle.throttle(|| self.provider.fetch_rate(base, quote)).await {
                Ok(rate) => rates.push(rate),
                Err(PulseError::EmptyPayload(_) | PulseError::InvalidParameter(_)) => {
                    debug!("No rate for {}/{}", base, quote);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(rates)
    }
}

#[async_trait]
impl SyncTask for FxAdapter {
    async fn sync(&self) -> Result<usize> {
        Ok(self
            .refresh(&self.default_base, &self.default_quotes)
            .await?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_cache::{MemoryStore, Origin};
    use pulse_core::{DataProvider, ManualClock};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Default)]
    struct MockProvider {
        started: Mutex<Vec<Instant>>,
        rate_limited: bool,
    }

    impl DataProvider for MockProvider {
        fn name(&self) -> &str {
            "Mock"
        }

        fn description(&self) -> &str {
            "Mock rate provider"
        }
    }

    #[async_trait]
    impl FxRateProvider for MockProvider {
        async fn fetch_rate(&self, base: &str, quote: &str) -> Result<FxRate> {
            self.started.lock().unwrap().push(Instant::now());
            if self.rate_limited {
                return Err(PulseError::RateLimited {
                    provider: "Mock".to_string(),
                    retry_after: None,
                });
            }
            if quote == "XXX" {
                return Err(PulseError::EmptyPayload("Mock".to_string()));
            }
            Ok(FxRate::new(base, quote, 2.0, Utc::now()))
        }
    }

    fn adapter(provider: Arc<MockProvider>) -> FxAdapter {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(TieredCache::new(Arc::new(MemoryStore::new()), clock));
        FxAdapter::new(provider, cache)
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(
            FxAdapter::cache_key("usd", &codes(&["jpy", "EUR"])),
            "fx:USD:EUR,JPY"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_pair_respects_strict_quota() {
        let provider = Arc::new(MockProvider::default());
        let adapter = adapter(provider.clone());

        let result = adapter
            .fetch_with_origin("USD", &codes(&["EUR", "GBP", "JPY"]))
            .await;
        assert_eq!(result.origin, Origin::Live);
        assert_eq!(result.data.len(), 3);

        let started = provider.started.lock().unwrap().clone();
        assert_eq!(started.len(), 3);
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(12));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_pairs_are_skipped() {
        let provider = Arc::new(MockProvider::default());
        let adapter = adapter(provider.clone());

        let rates = adapter.refresh("USD", &codes(&["EUR", "XXX", "usd"])).await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].pair(), "USD/EUR");
        // The base itself is never requested.
        assert_eq!(provider.started.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_error_falls_back() {
        let provider = Arc::new(MockProvider {
            rate_limited: true,
            ..MockProvider::default()
        });
        let adapter = adapter(provider);

        let result = adapter.fetch_with_origin("USD", &codes(&["EUR"])).await;
        assert_eq!(result.origin, Origin::Fallback);
        assert_eq!(result.data[0].pair(), "USD/EUR");

        assert!(matches!(
            adapter.sync().await,
            Err(PulseError::RateLimited { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_counts_default_pairs() {
        let provider = Arc::new(MockProvider::default());
        let adapter = adapter(provider).with_defaults("EUR", codes(&["USD", "GBP"]));
        assert_eq!(adapter.sync().await.unwrap(), 2);
    }
}
