//! Wiring of the calendar, cache, adapters and orchestrator.

use pulse_cache::{MarketGate, MemoryStatusStore, MemoryStore, TieredCache};
use pulse_core::{
    Clock, ExchangeCalendarEntry, FreshnessVerdict, FxRateProvider, IndicatorProvider,
    KeyValueStore, MarketStatus, QuoteProvider, Result, StatusStore, SyncFrequency,
    SyncScheduleEntry, SyncStatusRecord, SystemClock, TradingCalendar,
    calendar::default_exchanges,
};
use pulse_fx::{AlphaVantageFxProvider, FxAdapter};
use pulse_indicators::{IndicatorAdapter, WorldBankProvider};
use pulse_quotes::{FmpQuoteProvider, QuoteAdapter};
use pulse_sync::{FreshnessBoard, Scheduler, SyncLock, SyncOrchestrator, TokioScheduler};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::PulseConfig;

/// Source id of the quote feed.
pub const QUOTES: &str = "quotes";
/// Source id of the FX feed.
pub const FX: &str = "fx";
/// Source id of the macro-indicator feed.
pub const INDICATORS: &str = "indicators";

/// How often each source is synced.
///
/// FX runs daily because one sync spends one request per currency pair and
/// the free Alpha Vantage tier allows 25 a day. Indicators are yearly figures
/// and sync monthly.
#[must_use]
pub fn default_schedule() -> Vec<SyncScheduleEntry> {
    vec![
        SyncScheduleEntry::new(QUOTES, SyncFrequency::Hourly),
        SyncScheduleEntry::new(FX, SyncFrequency::Daily),
        SyncScheduleEntry::new(INDICATORS, SyncFrequency::Monthly),
    ]
}

type Stores = (Arc<dyn KeyValueStore>, Arc<dyn StatusStore>);

/// Builder for [`PulseRuntime`].
///
/// Anything not supplied is derived from the [`PulseConfig`]: real providers,
/// the system clock, a tokio scheduler and the default venues.
#[derive(Debug)]
pub struct PulseRuntimeBuilder {
    config: PulseConfig,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    stores: Option<Stores>,
    exchanges: Option<Vec<ExchangeCalendarEntry>>,
    schedule: Option<Vec<SyncScheduleEntry>>,
    quote_provider: Option<Arc<dyn QuoteProvider>>,
    fx_provider: Option<Arc<dyn FxRateProvider>>,
    indicator_provider: Option<Arc<dyn IndicatorProvider>>,
    lock: Option<SyncLock>,
}

impl PulseRuntimeBuilder {
    fn new(config: PulseConfig) -> Self {
        Self {
            config,
            clock: None,
            scheduler: None,
            stores: None,
            exchanges: None,
            schedule: None,
            quote_provider: None,
            fx_provider: None,
            indicator_provider: None,
            lock: None,
        }
    }

    /// Use `clock` instead of the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use `scheduler` instead of a [`TokioScheduler`].
    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Use these stores instead of opening them from the configuration.
    #[must_use]
    pub fn stores(mut self, cache: Arc<dyn KeyValueStore>, status: Arc<dyn StatusStore>) -> Self {
        self.stores = Some((cache, status));
        self
    }

    /// Venues known to the trading calendar.
    #[must_use]
    pub fn exchanges(mut self, exchanges: Vec<ExchangeCalendarEntry>) -> Self {
        self.exchanges = Some(exchanges);
        self
    }

    /// Overrides [`default_schedule`]. Entries for unknown source ids are ignored.
    #[must_use]
    pub fn schedule(mut self, schedule: Vec<SyncScheduleEntry>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Replace the quote provider.
    #[must_use]
    pub fn quote_provider(mut self, provider: Arc<dyn QuoteProvider>) -> Self {
        self.quote_provider = Some(provider);
        self
    }

    /// Replace the FX provider.
    #[must_use]
    pub fn fx_provider(mut self, provider: Arc<dyn FxRateProvider>) -> Self {
        self.fx_provider = Some(provider);
        self
    }

    /// Replace the indicator provider.
    #[must_use]
    pub fn indicator_provider(mut self, provider: Arc<dyn IndicatorProvider>) -> Self {
        self.indicator_provider = Some(provider);
        self
    }

    /// Share a sync lock with other runtimes.
    #[must_use]
    pub fn lock(mut self, lock: SyncLock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Assembles the runtime. No network call is made.
    ///
    /// # Errors
    /// Returns an error if the configured database cannot be opened.
    pub fn build(self) -> Result<PulseRuntime> {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let (kv, status) = match self.stores {
            Some(stores) => stores,
            None => open_stores(config.db_path.as_deref())?,
        };

        let calendar = Arc::new(TradingCalendar::new(
            self.exchanges.unwrap_or_else(default_exchanges),
            clock.clone(),
        ));
        let cache = Arc::new(TieredCache::new(kv, clock.clone()));

        let quote_provider = self.quote_provider.unwrap_or_else(|| {
            Arc::new(FmpQuoteProvider::new(
                config.fmp_api_key.clone().unwrap_or_default(),
            ))
        });
        let fx_provider = self.fx_provider.unwrap_or_else(|| {
            Arc::new(AlphaVantageFxProvider::new(
                config.alpha_vantage_api_key.clone().unwrap_or_default(),
            ))
        });
        let indicator_provider = self
            .indicator_provider
            .unwrap_or_else(|| Arc::new(WorldBankProvider::new()));

        let quotes = Arc::new(QuoteAdapter::new(
            quote_provider.clone(),
            cache.clone(),
            MarketGate::global(calendar.clone()),
        ));
        let fx = Arc::new(FxAdapter::new(fx_provider.clone(), cache.clone()));
        let indicators = Arc::new(IndicatorAdapter::new(indicator_provider, cache.clone()));

        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new()));
        let mut orchestrator = SyncOrchestrator::new(status, scheduler, clock.clone());
        if let Some(lock) = self.lock {
            orchestrator = orchestrator.with_lock(lock);
        }
        for entry in self.schedule.unwrap_or_else(default_schedule) {
            let source = entry.source.clone();
            orchestrator = match source.as_str() {
                QUOTES => orchestrator
                    .with_source(entry, quotes.clone())
                    .with_display(QUOTES, "Market quotes"),
                FX => orchestrator
                    .with_source(entry, fx.clone())
                    .with_display(FX, "Exchange rates"),
                INDICATORS => orchestrator
                    .with_source(entry, indicators.clone())
                    .with_display(INDICATORS, "Macro indicators"),
                _ => orchestrator,
            };
        }

        info!(
            quotes_configured = quote_provider.is_configured(),
            fx_configured = fx_provider.is_configured(),
            durable = config.db_path.is_some(),
            "Pulse runtime ready"
        );

        Ok(PulseRuntime {
            clock,
            calendar,
            cache,
            quotes,
            fx,
            indicators,
            orchestrator: Arc::new(orchestrator),
        })
    }
}

#[cfg(feature = "sqlite")]
fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    if let Some(path) = db_path {
        let store = Arc::new(pulse_cache::SqliteStore::new(path)?);
        return Ok((store.clone(), store));
    }
    Ok(memory_stores())
}

#[cfg(not(feature = "sqlite"))]
fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    if db_path.is_some() {
        tracing::warn!("Built without sqlite, keeping the durable tier in memory");
    }
    Ok(memory_stores())
}

fn memory_stores() -> Stores {
    (
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStatusStore::new()),
    )
}

/// The data-freshness layer, fully wired.
///
/// Dropping the runtime stops every sync timer.
#[derive(Debug)]
pub struct PulseRuntime {
    clock: Arc<dyn Clock>,
    calendar: Arc<TradingCalendar>,
    cache: Arc<TieredCache>,
    quotes: Arc<QuoteAdapter>,
    fx: Arc<FxAdapter>,
    indicators: Arc<IndicatorAdapter>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl PulseRuntime {
    /// Start building a runtime from `config`.
    #[must_use]
    pub fn builder(config: PulseConfig) -> PulseRuntimeBuilder {
        PulseRuntimeBuilder::new(config)
    }

    /// The clock every component reads.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The trading calendar.
    #[must_use]
    pub fn calendar(&self) -> &Arc<TradingCalendar> {
        &self.calendar
    }

    /// The shared two-tier cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// The quote adapter.
    #[must_use]
    pub fn quotes(&self) -> &QuoteAdapter {
        &self.quotes
    }

    /// The FX adapter.
    #[must_use]
    pub fn fx(&self) -> &FxAdapter {
        &self.fx
    }

    /// The macro-indicator adapter.
    #[must_use]
    pub fn indicators(&self) -> &IndicatorAdapter {
        &self.indicators
    }

    /// The sync orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    /// Open/closed state of every venue right now.
    #[must_use]
    pub fn market_status(&self) -> Vec<MarketStatus> {
        self.calendar.statuses()
    }

    /// See [`SyncOrchestrator::start_automatic_sync`].
    pub async fn start_automatic_sync(&self) -> Vec<SyncStatusRecord> {
        self.orchestrator.start_automatic_sync().await
    }

    /// See [`SyncOrchestrator::stop_automatic_sync`].
    pub fn stop_automatic_sync(&self) {
        self.orchestrator.stop_automatic_sync();
    }

    /// See [`SyncOrchestrator::force_sync`].
    pub async fn force_sync(&self, source: Option<&str>) -> Vec<SyncStatusRecord> {
        self.orchestrator.force_sync(source).await
    }

    /// See [`SyncOrchestrator::get_sync_status`].
    pub async fn get_sync_status(&self) -> Vec<SyncStatusRecord> {
        self.orchestrator.get_sync_status().await
    }

    /// See [`SyncOrchestrator::get_data_freshness`].
    pub async fn get_data_freshness(&self) -> Vec<FreshnessVerdict> {
        self.orchestrator.get_data_freshness().await
    }

    /// See [`SyncOrchestrator::freshness_board`].
    pub async fn freshness_board(&self) -> FreshnessBoard {
        self.orchestrator.freshness_board().await
    }
}

impl Drop for PulseRuntime {
    fn drop(&mut self) {
        self.orchestrator.stop_automatic_sync();
    }
}
