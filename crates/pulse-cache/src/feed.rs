//! The fetch pipeline shared by every source adapter.
//!
//! Order of preference: fresh cache, throttled live call, stale cache, static
//! fallback table. A live call is skipped when the feed's market gate is closed
//! or the provider has no credential.

use pulse_core::{PulseError, Result, Throttle, TradingCalendar, observe};
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::tiered::{StaleRead, TieredCache};

/// Where a fetched value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Fresh from the remote feed.
    Live,
    /// Unexpired cache entry.
    Cache,
    /// Expired cache entry of the given age.
    Stale {
        /// Time since the entry was captured.
        age: Duration,
    },
    /// Static last-known-good table.
    Fallback,
}

impl Origin {
    /// Short label for logs and displays.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cache => "cache",
            Self::Stale { .. } => "stale",
            Self::Fallback => "fallback",
        }
    }
}

/// A value tagged with its [`Origin`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    /// The value.
    pub data: T,
    /// Where it came from.
    pub origin: Origin,
}

impl<T> Sourced<T> {
    /// Drops the origin tag.
    pub fn into_data(self) -> T {
        self.data
    }
}

/// Market-hours condition for live calls.
#[derive(Debug, Clone)]
pub struct MarketGate {
    calendar: Arc<TradingCalendar>,
    exchanges: Vec<String>,
}

impl MarketGate {
    /// Gate on the given venues: open when any of them is in session.
    #[must_use]
    pub fn new<I, S>(calendar: Arc<TradingCalendar>, exchanges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            calendar,
            exchanges: exchanges.into_iter().map(Into::into).collect(),
        }
    }

    /// Gate on every venue of the calendar.
    #[must_use]
    pub fn global(calendar: Arc<TradingCalendar>) -> Self {
        Self {
            calendar,
            exchanges: Vec::new(),
        }
    }

    /// Returns true if a live call is warranted right now.
    #[must_use]
    pub fn is_open(&self) -> bool {
        if self.exchanges.is_empty() {
            return self.calendar.any_open();
        }
        self.exchanges
            .iter()
            .any(|code| self.calendar.status(code).is_open)
    }
}

/// Cache, gate and throttle for one remote feed.
#[derive(Debug)]
pub struct CachedFeed {
    name: String,
    cache: Arc<TieredCache>,
    throttle: Throttle,
    ttl: Duration,
    gate: Option<MarketGate>,
}

impl CachedFeed {
    /// Create a feed that caches live results for `ttl`.
    #[must_use]
    pub fn new(name: impl Into<String>, cache: Arc<TieredCache>, throttle: Throttle, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            cache,
            throttle,
            ttl,
            gate: None,
        }
    }

    /// Skip live calls while `gate` is closed.
    #[must_use]
    pub fn with_market_gate(mut self, gate: MarketGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Replace the throttle.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Feed name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// TTL applied to live results.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cache backing this feed.
    #[must_use]
    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// Returns false while the market gate is closed.
    #[must_use]
    pub fn market_open(&self) -> bool {
        self.gate.as_ref().is_none_or(MarketGate::is_open)
    }

    /// Runs the full pipeline for `key`. Never fails.
    ///
    /// `live` receives the feed's throttle and must start every outbound
    /// request through it. `configured` is false when the provider lacks a
    /// credential, which limits the result to cache and fallback data.
    #[instrument(skip(self, live, fallback), fields(feed = %self.name))]
    pub async fn fetch<'a, X, F, Fut, G>(
        &'a self,
        key: &str,
        configured: bool,
        live: F,
        fallback: G,
    ) -> Sourced<Vec<X>>
    where
        X: Serialize + DeserializeOwned,
        F: FnOnce(&'a Throttle) -> Fut,
        Fut: Future<Output = Result<Vec<X>>>,
        G: FnOnce() -> Vec<X>,
    {
        if let Some(data) = self.cache.get::<Vec<X>>(key, None).await {
            debug!("Serving from cache");
            return Sourced {
                data,
                origin: Origin::Cache,
            };
        }

        if !self.market_open() {
            debug!("Market closed, skipping live call");
            return self.degrade(key, fallback).await;
        }
        if !configured {
            debug!("Provider not configured, skipping live call");
            return self.degrade(key, fallback).await;
        }

        match self.live(key, live).await {
            Ok(data) => Sourced {
                data,
                origin: Origin::Live,
            },
            Err(e) => {
                observe::swallowed(&format!("feed.{}", self.name), &e);
                self.degrade(key, fallback).await
            }
        }
    }

    /// Performs the live call for `key`, bypassing the cache lookup.
    ///
    /// A closed market gate is not a failure and yields an empty result.
    ///
    /// # Errors
    /// Returns [`PulseError::ProviderNotConfigured`] without a credential, the
    /// provider's error on failure, and [`PulseError::EmptyPayload`] when the
    /// provider returns nothing.
    #[instrument(skip(self, live), fields(feed = %self.name))]
    pub async fn refresh<'a, X, F, Fut>(
        &'a self,
        key: &str,
        configured: bool,
        live: F,
    ) -> Result<Vec<X>>
    where
        X: Serialize + DeserializeOwned,
        F: FnOnce(&'a Throttle) -> Fut,
        Fut: Future<Output = Result<Vec<X>>>,
    {
        if !configured {
            return Err(PulseError::ProviderNotConfigured(self.name.clone()));
        }
        if !self.market_open() {
            debug!("Market closed, nothing to refresh");
            return Ok(Vec::new());
        }
        self.live(key, live).await
    }

    async fn live<'a, X, F, Fut>(&'a self, key: &str, live: F) -> Result<Vec<X>>
    where
        X: Serialize,
        F: FnOnce(&'a Throttle) -> Fut,
        Fut: Future<Output = Result<Vec<X>>>,
    {
        let data = live(&self.throttle).await?;
        if data.is_empty() {
            return Err(PulseError::EmptyPayload(self.name.clone()));
        }

        if let Err(e) = self.cache.set(key, &data, self.ttl).await {
            observe::swallowed(&format!("feed.{}.cache", self.name), &e);
        }
        debug!("Fetched {} records live", data.len());
        Ok(data)
    }

    async fn degrade<X, G>(&self, key: &str, fallback: G) -> Sourced<Vec<X>>
    where
        X: DeserializeOwned,
        G: FnOnce() -> Vec<X>,
    {
        match self.cache.get_stale::<Vec<X>>(key).await {
            Some(StaleRead { data, age }) if !data.is_empty() => {
                debug!(age_secs = age.as_secs(), "Serving stale cache entry");
                Sourced {
                    data,
                    origin: Origin::Stale { age },
                }
            }
            _ => {
                debug!("Serving fallback table");
                Sourced {
                    data: fallback(),
                    origin: Origin::Fallback,
                }
            }
        }
    }
}
