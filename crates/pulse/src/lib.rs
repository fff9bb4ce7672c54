#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pulse/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Data-freshness and sync layer for market dashboards.
//!
//! This crate re-exports the pulse crates and wires them into a
//! [`PulseRuntime`]: trading calendar, two-tier cache, the quote, FX and
//! macro-indicator adapters, and the sync orchestrator.
//!
//! # Features
//!
//! - `sqlite` - SQLite durable tier, used when `PULSE_DB_PATH` is set (default)

// Core types and traits
pub use pulse_core::*;

// Stores and cache
#[cfg(feature = "sqlite")]
pub use pulse_cache::SqliteStore;
pub use pulse_cache::{
    CachedFeed, MarketGate, MemoryStatusStore, MemoryStore, NoopStore, Origin, Sourced,
    TieredCache,
};

// Feeds
pub use pulse_fx::{AlphaVantageFxProvider, FxAdapter};
pub use pulse_indicators::{IndicatorAdapter, WorldBankProvider};
pub use pulse_quotes::{FmpQuoteProvider, QuoteAdapter};

// Orchestration
pub use pulse_sync::{
    FreshnessBoard, FreshnessRow, ManualScheduler, Scheduler, SourceDisplay, SyncLock,
    SyncOrchestrator, TokioScheduler,
};

mod config;
pub use config::{ALPHA_VANTAGE_API_KEY, FMP_API_KEY, PULSE_DB_PATH, PulseConfig};

mod runtime;
pub use runtime::{FX, INDICATORS, PulseRuntime, PulseRuntimeBuilder, QUOTES, default_schedule};
