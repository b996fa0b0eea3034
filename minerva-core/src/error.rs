//! Error types for Minerva Core

use thiserror::Error;

/// Errors returned by [`crate::Resolver::fetch`]
///
/// Cloneable so that a single in-flight outcome can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The identifier could not be turned into a valid request target
    #[error("Malformed request for ISBN {isbn:?}")]
    MalformedRequest { isbn: String },

    /// Network error, non-success status, timeout or unexpected payload
    #[error("Lookup failed for ISBN {isbn:?}: {reason}")]
    TransportOrDecodeFailure { isbn: String, reason: String },
}

impl LookupError {
    /// The identifier the failed lookup was issued for
    pub fn isbn(&self) -> &str {
        match self {
            Self::MalformedRequest { isbn } => isbn,
            Self::TransportOrDecodeFailure { isbn, .. } => isbn,
        }
    }

    /// Whether retrying the same identifier may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportOrDecodeFailure { .. })
    }
}

/// Errors raised by an HTTP transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
