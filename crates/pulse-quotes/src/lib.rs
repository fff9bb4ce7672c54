#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pulse/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Equity and index quote feed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulse_quotes::{FmpQuoteProvider, QuoteAdapter};
//! use pulse_cache::MarketGate;
//! use pulse_core::Symbol;
//!
//! let provider = Arc::new(FmpQuoteProvider::new("your_api_key"));
//! let adapter = QuoteAdapter::new(provider, cache, MarketGate::global(calendar));
//!
//! // Live, cached, stale or fallback quotes; never an error.
//! let quotes = adapter.fetch(&[Symbol::new("^GSPC")]).await;
//! ```

/// Quote source adapter.
pub mod adapter;
/// Static fallback quotes.
pub mod fallback;
/// FMP quote provider.
pub mod provider;

pub use adapter::{DEFAULT_SYMBOLS, QUOTE_TTL, QuoteAdapter};
pub use fallback::fallback_quotes;
pub use provider::FmpQuoteProvider;
