//! Last-known-good quotes served when neither the feed nor the cache has data.
//!
//! Values are approximate year-end 2024 closes and only stand in until the next
//! successful refresh.

use chrono::{DateTime, Utc};
use pulse_core::{Quote, Symbol};

/// 2024-12-31T00:00:00Z.
const TABLE_AS_OF: i64 = 1_735_603_200;

/// (symbol, price, change, change %, currency)
const QUOTES: &[(&str, f64, f64, f64, &str)] = &[
    ("^GSPC", 5881.63, -25.31, -0.43, "USD"),
    ("^IXIC", 19310.79, -175.99, -0.90, "USD"),
    ("^DJI", 42544.22, -418.48, -0.97, "USD"),
    ("^GSPTSE", 24727.94, 122.00, 0.50, "CAD"),
    ("^BVSP", 120283.40, -986.00, -0.81, "BRL"),
    ("^FTSE", 8173.02, 51.91, 0.64, "GBP"),
    ("^GDAXI", 19909.14, -75.18, -0.38, "EUR"),
    ("^FCHI", 7380.74, 25.37, 0.34, "EUR"),
    ("^J203.JO", 84095.13, 217.00, 0.26, "ZAR"),
    ("^NSEI", 23644.80, -0.10, 0.00, "INR"),
    ("^HSI", 20059.95, 18.53, 0.09, "HKD"),
    ("^N225", 39894.54, -386.62, -0.96, "JPY"),
    ("^AXJO", 8159.10, -75.00, -0.91, "AUD"),
];

fn table() -> Vec<Quote> {
    let as_of = DateTime::<Utc>::from_timestamp(TABLE_AS_OF, 0).unwrap_or_default();
    QUOTES
        .iter()
        .map(|&(symbol, price, change, change_percent, currency)| {
            Quote::new(symbol, price, as_of)
                .with_change(change, change_percent)
                .with_currency(currency)
        })
        .collect()
}

/// Fallback quotes for `symbols`.
///
/// Symbols missing from the table are omitted; when none match, the whole
/// table is returned so callers always get data.
#[must_use]
pub fn fallback_quotes(symbols: &[Symbol]) -> Vec<Quote> {
    let all = table();
    let matched: Vec<Quote> = all
        .iter()
        .filter(|q| symbols.contains(&q.symbol))
        .cloned()
        .collect();
    if matched.is_empty() { all } else { matched }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_filters_known_symbols() {
        let quotes = fallback_quotes(&[Symbol::new("^gspc"), Symbol::new("UNKNOWN")]);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol.as_str(), "^GSPC");
        assert_eq!(quotes[0].currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_fallback_is_never_empty() {
        assert_eq!(fallback_quotes(&[Symbol::new("ZZZZ")]).len(), QUOTES.len());
        assert_eq!(fallback_quotes(&[]).len(), QUOTES.len());
    }
}
