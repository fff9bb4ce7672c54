//! Feed value types.
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`Quote`] - Latest price for a symbol
//! - [`FxRate`] - Exchange rate between two currencies
//! - [`Indicator`] - One yearly macro-economic observation for a country

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Latest quote for a symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Quoted symbol.
    pub symbol: Symbol,
    /// Last traded price.
    pub price: f64,
    /// Absolute change against the previous close.
    pub change: f64,
    /// Percentage change against the previous close.
    pub change_percent: f64,
    /// Trading currency, when the feed reports it.
    pub currency: Option<String>,
    /// When the quote was observed.
    pub as_of: DateTime<Utc>,
}

impl Quote {
    /// Creates a quote with no change information.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, price: f64, as_of: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change: 0.0,
            change_percent: 0.0,
            currency: None,
            as_of,
        }
    }

    /// Sets the change against the previous close.
    #[must_use]
    pub const fn with_change(mut self, change: f64, change_percent: f64) -> Self {
        self.change = change;
        self.change_percent = change_percent;
        self
    }

    /// Sets the trading currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// Exchange rate: one unit of `base` costs `rate` units of `quote`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxRate {
    /// Base currency (ISO 4217).
    pub base: String,
    /// Quote currency (ISO 4217).
    pub quote: String,
    /// Units of `quote` per unit of `base`.
    pub rate: f64,
    /// When the rate was observed.
    pub as_of: DateTime<Utc>,
}

impl FxRate {
    /// Creates a rate, uppercasing both currency codes.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        quote: impl Into<String>,
        rate: f64,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
            rate,
            as_of,
        }
    }

    /// Currency pair label, e.g. `USD/EUR`.
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

/// One yearly observation of a macro-economic indicator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// ISO country code.
    pub country: String,
    /// Indicator code, e.g. `NY.GDP.MKTP.KD.ZG`.
    pub code: String,
    /// Observation year.
    pub year: i32,
    /// Observed value.
    pub value: f64,
}

impl Indicator {
    /// Creates an observation, uppercasing the country code.
    #[must_use]
    pub fn new(country: impl Into<String>, code: impl Into<String>, year: i32, value: f64) -> Self {
        Self {
            country: country.into().to_uppercase(),
            code: code.into(),
            year,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_uppercases() {
        assert_eq!(Symbol::new("aapl").as_str(), "AAPL");
        assert_eq!(Symbol::from("msft"), Symbol::new("MSFT"));
    }

    #[test]
    fn test_fx_pair_label() {
        let rate = FxRate::new("usd", "eur", 0.92, Utc::now());
        assert_eq!(rate.pair(), "USD/EUR");
    }
}
