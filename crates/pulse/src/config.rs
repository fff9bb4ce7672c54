//! Startup configuration.

use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable holding the Financial Modeling Prep API key.
pub const FMP_API_KEY: &str = "FMP_API_KEY";
/// Environment variable holding the Alpha Vantage API key.
pub const ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
/// Environment variable naming the SQLite file of the durable tier.
pub const PULSE_DB_PATH: &str = "PULSE_DB_PATH";

/// Credentials and storage location, read once at startup.
///
/// Every field is optional. A missing credential leaves its source on cached
/// and fallback data; a missing database path keeps the durable tier in memory.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PulseConfig {
    /// Financial Modeling Prep API key, for quotes.
    pub fmp_api_key: Option<String>,
    /// Alpha Vantage API key, for FX rates.
    pub alpha_vantage_api_key: Option<String>,
    /// SQLite file for the durable cache tier and the status log.
    pub db_path: Option<PathBuf>,
}

impl std::fmt::Debug for PulseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("PulseConfig")
            .field("fmp_api_key", &redact(&self.fmp_api_key))
            .field("alpha_vantage_api_key", &redact(&self.alpha_vantage_api_key))
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl PulseConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the given variables instead of the environment.
    #[must_use]
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            fmp_api_key: non_blank(FMP_API_KEY),
            alpha_vantage_api_key: non_blank(ALPHA_VANTAGE_API_KEY),
            db_path: non_blank(PULSE_DB_PATH).map(PathBuf::from),
        }
    }

    /// Set the FMP API key.
    #[must_use]
    pub fn with_fmp_api_key(mut self, key: impl Into<String>) -> Self {
        self.fmp_api_key = Some(key.into());
        self
    }

    /// Set the Alpha Vantage API key.
    #[must_use]
    pub fn with_alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    /// Set the SQLite database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_map() {
        let config = PulseConfig::from_map(&vars(&[
            (FMP_API_KEY, "fmp-key"),
            (PULSE_DB_PATH, "/tmp/pulse.db"),
        ]));
        assert_eq!(config.fmp_api_key.as_deref(), Some("fmp-key"));
        assert!(config.alpha_vantage_api_key.is_none());
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/pulse.db")));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = PulseConfig::from_map(&vars(&[
            (FMP_API_KEY, "   "),
            (ALPHA_VANTAGE_API_KEY, ""),
        ]));
        assert_eq!(config, PulseConfig::default());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = PulseConfig::default().with_fmp_api_key("secret-value");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }
}
