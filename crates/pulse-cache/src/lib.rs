#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pulse/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching for the pulse data-freshness layer.
//!
//! Stores implementing the [`KeyValueStore`] and [`StatusStore`] traits from `pulse-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite-based store (default, requires `sqlite` feature)
//! - [`MemoryStore`] / [`MemoryStatusStore`] - In-memory stores for testing
//! - [`NoopStore`] - Store that doesn't keep anything
//!
//! On top of them, [`TieredCache`] and the [`CachedFeed`] pipeline every source
//! adapter runs through.

/// Cached-feed pipeline.
pub mod feed;
/// In-memory store implementations.
pub mod memory;
/// No-op store implementation.
pub mod noop;
/// Two-tier cache.
pub mod tiered;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the traits for convenience
pub use pulse_core::{KeyValueStore, StatusStore};

pub use feed::{CachedFeed, MarketGate, Origin, Sourced};
pub use memory::{MemoryStatusStore, MemoryStore};
pub use noop::NoopStore;
pub use tiered::{CACHE_PREFIX, CacheEntry, StaleRead, TieredCache};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
