//! Resolver configuration
//!
//! Values come from `MINERVA_*` environment variables and fall back to
//! defaults that talk to the public Google Books endpoint.

use crate::error::ConfigError;
use crate::log_sink::DEFAULT_LOG_CAPACITY;
use std::time::Duration;
use url::Url;

/// Default books API base endpoint
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/books/v1";

/// Default bound on a single outbound request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_URL: &str = "MINERVA_BOOKS_API_URL";
pub const ENV_API_KEY: &str = "MINERVA_BOOKS_API_KEY";
pub const ENV_REQUEST_TIMEOUT: &str = "MINERVA_REQUEST_TIMEOUT_SECS";
pub const ENV_LOG_CAPACITY: &str = "MINERVA_LOG_CAPACITY";

/// Settings for [`crate::Resolver`]
#[derive(Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Base endpoint; `/volumes` is appended to it
    pub api_url: String,

    /// Access credential sent as the `key` query parameter
    pub api_key: Option<String>,

    /// Upper bound on one outbound request
    pub request_timeout: Duration,

    /// Messages buffered per log subscriber
    pub log_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

// Keep the credential out of logs
impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("log_capacity", &self.log_capacity)
            .finish()
    }
}

impl ResolverConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup(ENV_API_URL)) {
            config.api_url = url;
        }
        config.api_key = non_empty(lookup(ENV_API_KEY));

        if let Some(secs) = non_empty(lookup(ENV_REQUEST_TIMEOUT)) {
            config.request_timeout = parse_timeout(ENV_REQUEST_TIMEOUT, &secs)?;
        }
        if let Some(capacity) = non_empty(lookup(ENV_LOG_CAPACITY)) {
            config.log_capacity = capacity
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid(ENV_LOG_CAPACITY, &capacity, "expected a positive integer"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the base endpoint
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the access credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check that the endpoint and credential can form a request target
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => {}
            Ok(_) => return Err(invalid(ENV_API_URL, &self.api_url, "expected an http(s) URL")),
            Err(e) => return Err(invalid(ENV_API_URL, &self.api_url, &e.to_string())),
        }

        if let Some(key) = &self.api_key {
            if !key.chars().all(is_unreserved) {
                return Err(invalid(
                    ENV_API_KEY,
                    "<redacted>",
                    "credential contains characters that are not URL-safe",
                ));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(invalid(ENV_REQUEST_TIMEOUT, "0", "timeout must be positive"));
        }

        Ok(())
    }
}

/// Parse a timeout given in (possibly fractional) seconds
pub fn parse_timeout(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0 && *secs <= f64::from(u32::MAX))
        .map(Duration::from_secs_f64)
        .ok_or_else(|| invalid(name, value, "expected a positive number of seconds"))
}

/// RFC 3986 unreserved characters, safe to embed in a query without escaping
pub(crate) fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
