#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pulse/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Macro-economic indicator feed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulse_indicators::{IndicatorAdapter, WorldBankProvider, fallback::INFLATION};
//!
//! let adapter = IndicatorAdapter::new(Arc::new(WorldBankProvider::new()), cache);
//! let rows = adapter.fetch(&["US".to_string(), "JP".to_string()], INFLATION).await;
//! ```

/// Indicator source adapter.
pub mod adapter;
/// Static fallback indicators and well-known codes.
pub mod fallback;
/// World Bank indicator provider.
pub mod provider;

pub use adapter::{DEFAULT_CODES, DEFAULT_COUNTRIES, INDICATOR_TTL, IndicatorAdapter};
pub use fallback::{GDP_GROWTH, INFLATION, fallback_indicators};
pub use provider::WorldBankProvider;
