//! World Bank indicators provider.

use async_trait::async_trait;
use pulse_core::{DataProvider, Indicator, IndicatorProvider, PulseError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Base URL for the World Bank v2 API.
const WORLD_BANK_BASE_URL: &str = "https://api.worldbank.org/v2";

/// Years of history requested per country.
const MOST_RECENT_VALUES: u32 = 5;

/// Yearly indicators from the World Bank open data API. Needs no credential.
#[derive(Debug, Clone)]
pub struct WorldBankProvider {
    client: Client,
}

impl Default for WorldBankProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldBankProvider {
    /// Create a provider with a 30 second request timeout.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    /// Create a provider with a custom HTTP client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn url(countries: &[String], code: &str) -> String {
        let countries = countries
            .iter()
            .map(|c| c.to_uppercase())
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{WORLD_BANK_BASE_URL}/country/{countries}/indicator/{code}?format=json&per_page=500&mrv={MOST_RECENT_VALUES}"
        )
    }
}

/// Parses an indicator payload.
///
/// Rows with no value or a non-numeric year are dropped.
pub(crate) fn parse_indicators(text: &str, code: &str) -> Result<Vec<Indicator>> {
    let response: WorldBankResponse =
        serde_json::from_str(text).map_err(|e| PulseError::Parse(format!("{e}: {text}")))?;

    let points = match response {
        WorldBankResponse::Data(meta, points) => {
            let points = points.unwrap_or_default();
            debug!(code, total = ?meta.total, rows = points.len(), "Parsed indicator page");
            points
        }
        WorldBankResponse::Error(errors) => {
            let message = errors
                .into_iter()
                .flat_map(|e| e.message)
                .filter_map(|m| m.value)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PulseError::InvalidParameter(format!("{code}: {message}")));
        }
    };

    Ok(points
        .into_iter()
        .filter_map(|point| {
            let value = point.value?;
            let year = point.date.as_deref()?.parse::<i32>().ok()?;
            let country = point.country?.id?;
            Some(Indicator::new(country, code, year, value))
        })
        .collect())
}

impl DataProvider for WorldBankProvider {
    fn name(&self) -> &str {
        "World Bank"
    }

    fn description(&self) -> &str {
        "World Bank - Open macro-economic indicators"
    }
}

#[async_trait]
impl IndicatorProvider for WorldBankProvider {
    async fn fetch_indicators(&self, countries: &[String], code: &str) -> Result<Vec<Indicator>> {
        if countries.is_empty() {
            return Err(PulseError::InvalidParameter(
                "at least one country is required".to_string(),
            ));
        }
        debug!("World Bank request: {} for {} countries", code, countries.len());

        let response = self
            .client
            .get(Self::url(countries, code))
            .send()
            .await
            .map_err(|e| PulseError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PulseError::Network(format!("HTTP {status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| PulseError::Network(e.to_string()))?;

        parse_indicators(&text, code)
    }
}

// ============================================================================
// World Bank API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorldBankResponse {
    Data(WorldBankMeta, Option<Vec<WorldBankDataPoint>>),
    Error(Vec<WorldBankError>),
}

#[derive(Debug, Deserialize)]
struct WorldBankMeta {
    total: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WorldBankDataPoint {
    date: Option<String>,
    value: Option<f64>,
    country: Option<WorldBankCountry>,
}

#[derive(Debug, Deserialize)]
struct WorldBankCountry {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorldBankError {
    #[serde(default)]
    message: Vec<WorldBankMessage>,
}

#[derive(Debug, Deserialize)]
struct WorldBankMessage {
    value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let url = WorldBankProvider::url(&["us".to_string(), "GB".to_string()], "NY.GDP.MKTP.KD.ZG");
        assert_eq!(
            url,
            "https://api.worldbank.org/v2/country/US;GB/indicator/NY.GDP.MKTP.KD.ZG?format=json&per_page=500&mrv=5"
        );
    }

    #[test]
    fn test_parse_indicators() {
        let text = r#"[
            {"page": 1, "pages": 1, "per_page": "500", "total": 3},
            [
                {"indicator": {"id": "FP.CPI.TOTL.ZG", "value": "Inflation"}, "country": {"id": "US", "value": "United States"}, "date": "2023", "value": 4.1163},
                {"indicator": {"id": "FP.CPI.TOTL.ZG", "value": "Inflation"}, "country": {"id": "US", "value": "United States"}, "date": "2022", "value": 8.0028},
                {"indicator": {"id": "FP.CPI.TOTL.ZG", "value": "Inflation"}, "country": {"id": "GB", "value": "United Kingdom"}, "date": "2024", "value": null}
            ]
        ]"#;
        let rows = parse_indicators(text, "FP.CPI.TOTL.ZG").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].country, "US");
        assert_eq!(rows[0].year, 2023);
        assert_eq!(rows[1].value, 8.0028);
    }

    #[test]
    fn test_parse_empty_and_error_payloads() {
        let empty = r#"[{"page": 0, "pages": 0, "per_page": 500, "total": 0}, null]"#;
        assert!(parse_indicators(empty, "X").unwrap().is_empty());

        let error = r#"[{"message": [{"id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid"}]}]"#;
        assert!(matches!(
            parse_indicators(error, "X"),
            Err(PulseError::InvalidParameter(_))
        ));

        assert!(matches!(parse_indicators("oops", "X"), Err(PulseError::Parse(_))));
    }

    #[test]
    fn test_provider_metadata() {
        let provider = WorldBankProvider::new();
        assert_eq!(provider.name(), "World Bank");
        assert!(provider.is_configured());
    }
}
