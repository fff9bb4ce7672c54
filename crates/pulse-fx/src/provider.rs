//! Alpha Vantage currency exchange-rate provider.
//!
//! The free tier allows five calls per minute; pair it with
//! [`Throttle::strict_quota`](pulse_core::Throttle::strict_quota).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use pulse_core::{DataProvider, FxRate, FxRateProvider, PulseError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL for the Alpha Vantage API.
const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Realtime exchange rates from Alpha Vantage.
#[derive(Clone)]
pub struct AlphaVantageFxProvider {
    client: Client,
    api_key: String,
}

impl fmt::Debug for AlphaVantageFxProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlphaVantageFxProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl AlphaVantageFxProvider {
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

    fn url(&self, base: &str, quote: &str) -> String {
        format!(
            "{ALPHA_VANTAGE_BASE_URL}?function=CURRENCY_EXCHANGE_RATE&from_currency={base}&to_currency={quote}&apikey={}",
            self.api_key
        )
    }
}

/// Parses a `CURRENCY_EXCHANGE_RATE` payload.
///
/// Quota notices arrive with HTTP 200 under `Note` or `Information`.
pub(crate) fn parse_rate(text: &str, fetched_at: DateTime<Utc>) -> Result<FxRate> {
    let response: ExchangeRateResponse =
        serde_json::from_str(text).map_err(|e| PulseError::Parse(format!("{e}: {text}")))?;

    if let Some(msg) = response.error_message {
        return Err(PulseError::InvalidParameter(msg));
    }
    for msg in [response.note, response.information].into_iter().flatten() {
        if msg.contains("API call frequency") || msg.contains("rate limit") {
            return Err(PulseError::RateLimited {
                provider: "Alpha Vantage".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }
        warn!("Alpha Vantage notice: {}", msg);
    }

    let body = response
        .rate
        .ok_or_else(|| PulseError::EmptyPayload("Alpha Vantage".to_string()))?;

    let (Some(base), Some(quote)) = (body.from_code, body.to_code) else {
        return Err(PulseError::Parse(format!("missing currency codes: {text}")));
    };
    let rate = body
        .exchange_rate
        .as_deref()
        .and_then(|r| r.trim().parse::<f64>().ok())
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or_else(|| PulseError::Parse(format!("invalid rate for {base}/{quote}")))?;

    // Refresh stamps are reported in UTC.
    let as_of = body
        .last_refreshed
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .map_or(fetched_at, |naive| naive.and_utc());

    Ok(FxRate::new(base, quote, rate, as_of))
}

impl DataProvider for AlphaVantageFxProvider {
    fn name(&self) -> &str {
        "Alpha Vantage"
    }

    fn description(&self) -> &str {
        "Alpha Vantage - Realtime currency exchange rates"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl FxRateProvider for AlphaVantageFxProvider {
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<FxRate> {
        debug!("Alpha Vantage request: {}/{}", base, quote);

        let response = self
            .client
            .get(self.url(base, quote))
            .send()
            .await
            .map_err(|e| PulseError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PulseError::RateLimited {
                provider: "Alpha Vantage".to_string(),
                retry_after: None,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PulseError::Network(format!("HTTP {status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| PulseError::Network(e.to_string()))?;

        parse_rate(&text, Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    rate: Option<ExchangeRateBody>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRateBody {
    #[serde(rename = "1. From_Currency Code")]
    from_code: Option<String>,
    #[serde(rename = "3. To_Currency Code")]
    to_code: Option<String>,
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: Option<String>,
    #[serde(rename = "6. Last Refreshed")]
    last_refreshed: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_url_building() {
        let provider = AlphaVantageFxProvider::new("test_key");
        assert_eq!(
            provider.url("USD", "EUR"),
            "https://www.alphavantage.co/query?function=CURRENCY_EXCHANGE_RATE&from_currency=USD&to_currency=EUR&apikey=test_key"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = AlphaVantageFxProvider::new("secret_key_12345");
        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!AlphaVantageFxProvider::new("").is_configured());
    }

    #[test]
    fn test_parse_rate() {
        let text = r#"{
            "Realtime Currency Exchange Rate": {
                "1. From_Currency Code": "USD",
                "2. From_Currency Name": "United States Dollar",
                "3. To_Currency Code": "JPY",
                "4. To_Currency Name": "Japanese Yen",
                "5. Exchange Rate": "156.97800000",
                "6. Last Refreshed": "2024-06-03 14:05:01",
                "7. Time Zone": "UTC"
            }
        }"#;
        let rate = parse_rate(text, Utc::now()).unwrap();
        assert_eq!(rate.pair(), "USD/JPY");
        assert!((rate.rate - 156.978).abs() < 1e-9);
        assert_eq!(
            rate.as_of,
            Utc.with_ymd_and_hms(2024, 6, 3, 14, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_quota_notice_is_rate_limited() {
        let text = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        assert!(matches!(
            parse_rate(text, Utc::now()),
            Err(PulseError::RateLimited { .. })
        ));
    }

    #[test]
    fn test_malformed_payloads() {
        let now = Utc::now();
        assert!(matches!(parse_rate("{}", now), Err(PulseError::EmptyPayload(_))));
        assert!(matches!(
            parse_rate(r#"{"Error Message": "Invalid API call."}"#, now),
            Err(PulseError::InvalidParameter(_))
        ));
        let bad_rate = r#"{"Realtime Currency Exchange Rate": {
            "1. From_Currency Code": "USD", "3. To_Currency Code": "EUR", "5. Exchange Rate": "n/a"}}"#;
        assert!(matches!(parse_rate(bad_rate, now), Err(PulseError::Parse(_))));
    }
}
