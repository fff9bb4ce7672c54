#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pulse/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Currency exchange-rate feed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulse_fx::{AlphaVantageFxProvider, FxAdapter};
//!
//! let provider = Arc::new(AlphaVantageFxProvider::new("your_api_key"));
//! let adapter = FxAdapter::new(provider, cache);
//!
//! let rates = adapter.fetch("USD", &["EUR".to_string(), "JPY".to_string()]).await;
//! ```

/// Exchange-rate source adapter.
pub mod adapter;
/// Static fallback rates.
pub mod fallback;
/// Alpha Vantage rate provider.
pub mod provider;

pub use adapter::{DEFAULT_BASE, DEFAULT_QUOTES, FX_TTL, FxAdapter};
pub use fallback::fallback_rates;
pub use provider::AlphaVantageFxProvider;
