//! Financial Modeling Prep quote provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{DataProvider, PulseError, Quote, QuoteProvider, Result, Symbol};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Base URL for the FMP stable API.
const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Latest quotes from the FMP batch quote endpoint.
#[derive(Clone)]
pub struct FmpQuoteProvider {
    client: Client,
    api_key: String,
}

impl fmt::Debug for FmpQuoteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpQuoteProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl FmpQuoteProvider {
    /// Create a provider with the given API key.
    ///
    /// An empty key leaves the provider unconfigured.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::with_client(client, api_key)
    }

    /// Create a provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Build a URL with the API key appended.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.contains('?') {
            format!("{FMP_BASE_URL}/{endpoint}&apikey={}", self.api_key)
        } else {
            format!("{FMP_BASE_URL}/{endpoint}?apikey={}", self.api_key)
        }
    }

    /// Make a GET request and return the body.
    async fn get(&self, endpoint: &str) -> Result<String> {
        let url = self.url(endpoint);
        debug!("FMP request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PulseError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PulseError::RateLimited {
                provider: "FMP".to_string(),
                retry_after: None,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PulseError::Network(format!("HTTP {status}: {text}")));
        }

        response
            .text()
            .await
            .map_err(|e| PulseError::Network(e.to_string()))
    }
}

/// Parses a batch quote payload.
///
/// Rows without a symbol or a price are dropped; missing change fields read as zero.
pub(crate) fn parse_quotes(text: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Quote>> {
    // FMP reports errors with a 200 and an error object.
    if text.contains("\"Error Message\"") || text.contains("\"error\"") {
        return Err(PulseError::Network(text.to_string()));
    }

    let rows: Vec<FmpQuote> =
        serde_json::from_str(text).map_err(|e| PulseError::Parse(format!("{e}: {text}")))?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let symbol = row.symbol.filter(|s| !s.is_empty())?;
            let price = row.price.filter(|p| p.is_finite())?;
            let as_of = row
                .timestamp
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or(fetched_at);
            Some(
                Quote::new(symbol, price, as_of).with_change(
                    row.change.unwrap_or_default(),
                    row.change_percentage.unwrap_or_default(),
                ),
            )
        })
        .collect())
}

impl DataProvider for FmpQuoteProvider {
    fn name(&self) -> &str {
        "FMP"
    }

    fn description(&self) -> &str {
        "Financial Modeling Prep - Latest equity and index quotes"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl QuoteProvider for FmpQuoteProvider {
    async fn fetch_quotes(&self, symbols: &[Symbol]) -> Result<Vec<Quote>> {
        if symbols.is_empty() {
            return Err(PulseError::InvalidParameter(
                "at least one symbol is required".to_string(),
            ));
        }
        let list = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let text = self.get(&format!("batch-quote?symbols={list}")).await?;
        parse_quotes(&text, Utc::now())
    }
}

/// FMP quote row. Every field is optional; the feed omits fields freely.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpQuote {
    symbol: Option<String>,
    price: Option<f64>,
    change: Option<f64>,
    #[serde(alias = "changesPercentage")]
    change_percentage: Option<f64>,
    timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_url_building() {
        let provider = FmpQuoteProvider::new("test_key");
        assert_eq!(
            provider.url("batch-quote?symbols=AAPL,MSFT"),
            "https://financialmodelingprep.com/stable/batch-quote?symbols=AAPL,MSFT&apikey=test_key"
        );
    }

    #[test]
    fn test_provider_metadata() {
        let provider = FmpQuoteProvider::new("test_key");
        assert_eq!(provider.name(), "FMP");
        assert!(!provider.description().is_empty());
        assert!(provider.is_configured());
        assert!(!FmpQuoteProvider::new("  ").is_configured());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = FmpQuoteProvider::new("secret_key_12345");
        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_quotes_is_lenient() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap();
        let text = r#"[
            {"symbol": "AAPL", "price": 194.03, "change": 1.2, "changePercentage": 0.62, "timestamp": 1717426800},
            {"symbol": "MSFT", "price": 415.5, "changesPercentage": -0.3},
            {"symbol": "BROKEN"},
            {"price": 10.0}
        ]"#;

        let quotes = parse_quotes(text, fetched_at).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].symbol.as_str(), "AAPL");
        assert_eq!(quotes[0].change_percent, 0.62);
        assert_eq!(quotes[0].as_of.timestamp(), 1_717_426_800);
        assert_eq!(quotes[1].change, 0.0);
        assert_eq!(quotes[1].change_percent, -0.3);
        assert_eq!(quotes[1].as_of, fetched_at);
    }

    #[test]
    fn test_parse_error_payloads() {
        let now = Utc::now();
        assert!(matches!(
            parse_quotes(r#"{"Error Message": "Invalid API KEY."}"#, now),
            Err(PulseError::Network(_))
        ));
        assert!(matches!(parse_quotes("<html>", now), Err(PulseError::Parse(_))));
        assert!(parse_quotes("[]", now).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_symbol_list_is_rejected() {
        let provider = FmpQuoteProvider::new("test_key");
        let err = provider.fetch_quotes(&[]).await.unwrap_err();
        assert!(matches!(err, PulseError::InvalidParameter(_)));
    }
}
