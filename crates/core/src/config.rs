use std::env;
use std::time::Duration;

use crate::errors::CoreError;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MARKET_STALE_SECS: u64 = 300;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_TRANSACTIONS_LIMIT: u32 = 50;

/// Client configuration for talking to the Remote Store.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Prefix for every request (`API_BASE_URL`).
    pub api_base_url: String,
    /// Per-request timeout; elapsed requests fail as network errors.
    pub request_timeout: Duration,
    /// How long a market listing stays fresh.
    pub market_stale_after: Duration,
    /// Period of the market polling refresher.
    pub poll_interval: Duration,
    /// Default page size of the transaction history.
    pub transactions_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            market_stale_after: Duration::from_secs(DEFAULT_MARKET_STALE_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            transactions_limit: DEFAULT_TRANSACTIONS_LIMIT,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables (and `.env`, if present).
    ///
    /// Unset or unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Result<Self, CoreError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let config = Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(env_or(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            market_stale_after: Duration::from_secs(env_or(
                "MARKET_STALE_SECS",
                DEFAULT_MARKET_STALE_SECS,
            )),
            poll_interval: Duration::from_secs(env_or(
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )),
            transactions_limit: env_or("TRANSACTIONS_LIMIT", DEFAULT_TRANSACTIONS_LIMIT),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(CoreError::Configuration("API_BASE_URL is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::Configuration(format!(
                "API_BASE_URL must start with http:// or https://, got {url}"
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(CoreError::Configuration("Request timeout must be non-zero".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Configuration("Poll interval must be non-zero".into()));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim().trim_end_matches('/')
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
