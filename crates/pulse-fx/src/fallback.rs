//! Last-known-good exchange rates served when neither the feed nor the cache
//! has data.
//!
//! Approximate year-end 2024 USD rates. Cross rates are derived through USD.

use chrono::{DateTime, Utc};
use pulse_core::FxRate;

/// 2024-12-31T00:00:00Z.
const TABLE_AS_OF: i64 = 1_735_603_200;

/// Units of each currency per US dollar.
const USD_RATES: &[(&str, f64)] = &[
    ("EUR", 0.9615),
    ("GBP", 0.7980),
    ("JPY", 157.20),
    ("CAD", 1.4380),
    ("BRL", 6.1800),
    ("ZAR", 18.850),
    ("INR", 85.620),
    ("HKD", 7.7680),
    ("AUD", 1.6150),
    ("CNY", 7.2990),
    ("CHF", 0.9070),
];

fn usd_rate(code: &str) -> Option<f64> {
    if code.eq_ignore_ascii_case("USD") {
        return Some(1.0);
    }
    USD_RATES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|&(_, rate)| rate)
}

/// Fallback rates from `base` into each of `quotes`.
///
/// Unknown currencies are omitted; when nothing matches, the USD table is
/// returned so callers always get data.
#[must_use]
pub fn fallback_rates(base: &str, quotes: &[String]) -> Vec<FxRate> {
    let as_of = DateTime::<Utc>::from_timestamp(TABLE_AS_OF, 0).unwrap_or_default();

    let matched: Vec<FxRate> = usd_rate(base)
        .map(|base_rate| {
            quotes
                .iter()
                .filter(|q| !q.eq_ignore_ascii_case(base))
                .filter_map(|q| {
                    usd_rate(q).map(|quote_rate| FxRate::new(base, q, quote_rate / base_rate, as_of))
                })
                .collect()
        })
        .unwrap_or_default();

    if !matched.is_empty() {
        return matched;
    }
    USD_RATES
        .iter()
        .map(|&(code, rate)| FxRate::new("USD", code, rate, as_of))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_direct_usd_rates() {
        let rates = fallback_rates("usd", &codes(&["EUR", "XXX"]));
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].pair(), "USD/EUR");
        assert_eq!(rates[0].rate, 0.9615);
    }

    #[test]
    fn test_cross_rates_go_through_usd() {
        let rates = fallback_rates("EUR", &codes(&["GBP", "USD"]));
        assert_eq!(rates.len(), 2);
        assert!((rates[0].rate - 0.7980 / 0.9615).abs() < 1e-12);
        assert!((rates[1].rate - 1.0 / 0.9615).abs() < 1e-12);
    }

    #[test]
    fn test_fallback_is_never_empty() {
        assert_eq!(fallback_rates("XXX", &codes(&["EUR"])).len(), USD_RATES.len());
        assert_eq!(fallback_rates("USD", &[]).len(), USD_RATES.len());
    }
}
