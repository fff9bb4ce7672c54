//! Error types for the freshness layer.
//!
//! This module defines [`PulseError`] which covers all error cases that can occur
//! when fetching, parsing, caching or persisting feed data.

use thiserror::Error;

/// Errors that can occur while fetching, caching or syncing data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PulseError {
    /// Network-related errors (connection failures, timeouts, non-2xx responses).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// Error parsing a payload from a provider or from storage.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The provider answered successfully but returned nothing usable.
    #[error("Empty payload from {0}")]
    EmptyPayload(String),

    /// Error reading or writing durable storage.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The provider has no credential configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The sync source id is not part of the schedule.
    #[error("Unknown sync source: {0}")]
    UnknownSource(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`PulseError`].
pub type Result<T> = std::result::Result<T, PulseError>;
