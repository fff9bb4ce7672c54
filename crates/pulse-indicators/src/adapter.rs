//! Cached macro-indicator feed.

use async_trait::async_trait;
use pulse_cache::{CachedFeed, Sourced, TieredCache};
use pulse_core::{Indicator, IndicatorProvider, Result, SyncTask, Throttle};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::fallback::{GDP_GROWTH, INFLATION, fallback_indicators};

/// How long live indicators stay fresh in the cache.
pub const INDICATOR_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Countries refreshed by scheduled syncs unless overridden.
pub const DEFAULT_COUNTRIES: &[&str] = &["US", "CA", "BR", "GB", "DE", "FR", "ZA", "IN", "HK", "JP", "AU"];

/// Indicator codes refreshed by scheduled syncs unless overridden.
pub const DEFAULT_CODES: &[&str] = &[GDP_GROWTH, INFLATION];

/// Macro-indicator source adapter. Not market-bound.
#[derive(Debug)]
pub struct IndicatorAdapter {
    provider: Arc<dyn IndicatorProvider>,
    feed: CachedFeed,
    default_countries: Vec<String>,
    default_codes: Vec<String>,
}

impl IndicatorAdapter {
    /// Create an adapter over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn IndicatorProvider>, cache: Arc<TieredCache>) -> Self {
        Self {
            provider,
            feed: CachedFeed::new("indicators", cache, Throttle::standard(), INDICATOR_TTL),
            default_countries: DEFAULT_COUNTRIES.iter().map(ToString::to_string).collect(),
            default_codes: DEFAULT_CODES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Countries and codes refreshed by [`SyncTask::sync`].
    #[must_use]
    pub fn with_defaults(mut self, countries: Vec<String>, codes: Vec<String>) -> Self {
        self.default_countries = countries;
        self.default_codes = codes;
        self
    }

    /// Cache key for an indicator and country set; country order and case do not matter.
    #[must_use]
    pub fn cache_key(countries: &[String], code: &str) -> String {
        let mut sorted: Vec<String> = countries.iter().map(|c| c.to_uppercase()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        format!("indicators:{code}:{}", sorted.join(","))
    }

    /// Recent yearly values of `code` for `countries`. Never fails.
    pub async fn fetch(&self, countries: &[String], code: &str) -> Vec<Indicator> {
        self.fetch_with_origin(countries, code).await.into_data()
    }

    /// Like [`fetch`](Self::fetch), tagged with where the values came from.
    #[instrument(skip(self, countries), fields(countries = countries.len()))]
    pub async fn fetch_with_origin(&self, countries: &[String], code: &str) -> Sourced<Vec<Indicator>> {
        self.feed
            .fetch(
                &Self::cache_key(countries, code),
                self.provider.is_configured(),
                |throttle| throttle.throttle(|| self.provider.fetch_indicators(countries, code)),
                || fallback_indicators(countries, code),
            )
            .await
    }

    /// Fetches `code` for `countries` live and caches the result.
    ///
    /// # Errors
    /// Returns the provider's error, or an error when nothing came back.
    pub async fn refresh(&self, countries: &[String], code: &str) -> Result<Vec<Indicator>> {
        self.feed
            .refresh(
                &Self::cache_key(countries, code),
                self.provider.is_configured(),
                |throttle| throttle.throttle(|| self.provider.fetch_indicators(countries, code)),
            )
            .await
    }
}

#[async_trait]
impl SyncTask for IndicatorAdapter {
    /// Refreshes every default code in turn; stops at the first failure.
    async fn sync(&self) -> Result<usize> {
        let mut updated = 0;
        for code in &self.default_codes {
            updated += self.refresh(&self.default_countries, code).await?.len();
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_cache::{MemoryStore, Origin};
    use pulse_core::{DataProvider, ManualClock, PulseError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct MockProvider {
        calls: AtomicUsize,
        down: bool,
    }

    impl DataProvider for MockProvider {
        fn name(&self) -> &str {
            "Mock"
        }

        fn description(&self) -> &str {
            "Mock indicator provider"
        }
    }

    #[async_trait]
    impl IndicatorProvider for MockProvider {
        async fn fetch_indicators(&self, countries: &[String], code: &str) -> Result<Vec<Indicator>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(PulseError::Network("HTTP 502".to_string()));
            }
            Ok(countries
                .iter()
                .flat_map(|c| [Indicator::new(c, code, 2023, 1.5), Indicator::new(c, code, 2022, 1.0)])
                .collect())
        }
    }

    fn setup(provider: Arc<MockProvider>) -> (IndicatorAdapter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(TieredCache::new(Arc::new(MemoryStore::new()), clock.clone()));
        (IndicatorAdapter::new(provider, cache), clock)
    }

    fn countries(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(
            IndicatorAdapter::cache_key(&countries(&["gb", "US"]), GDP_GROWTH),
            "indicators:NY.GDP.MKTP.KD.ZG:GB,US"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_ttl() {
        let provider = Arc::new(MockProvider::default());
        let (adapter, clock) = setup(provider.clone());
        let list = countries(&["US"]);

        assert_eq!(adapter.fetch_with_origin(&list, INFLATION).await.origin, Origin::Live);

        clock.advance(Duration::from_secs(23 * 60 * 60));
        assert_eq!(adapter.fetch_with_origin(&list, INFLATION).await.origin, Origin::Cache);

        clock.advance(Duration::from_secs(2 * 60 * 60));
        assert_eq!(adapter.fetch_with_origin(&list, INFLATION).await.origin, Origin::Live);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_serves_fallback() {
        let provider = Arc::new(MockProvider {
            down: true,
            ..MockProvider::default()
        });
        let (adapter, _) = setup(provider);

        let result = adapter.fetch_with_origin(&countries(&["DE"]), GDP_GROWTH).await;
        assert_eq!(result.origin, Origin::Fallback);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].value, -0.3);
        assert!(adapter.sync().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_covers_every_default_code() {
        let provider = Arc::new(MockProvider::default());
        let (adapter, _) = setup(provider.clone());
        let adapter = adapter.with_defaults(
            countries(&["US", "JP"]),
            vec![GDP_GROWTH.to_string(), INFLATION.to_string()],
        );

        // Two codes, two countries, two years each.
        assert_eq!(adapter.sync().await.unwrap(), 8);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
