//! Client configuration.
//!
//! Loaded once per run from the process environment and passed into the
//! client at construction. Nothing reads the environment after that.

use std::time::Duration;
use thiserror::Error;

use crate::resilience::RetryPolicy;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the API base URL.
pub const ENDPOINT_ENV: &str = "SENTINEL_ENDPOINT";

/// Environment variable overriding the model name.
pub const MODEL_ENV: &str = "SENTINEL_MODEL";

/// Environment variable overriding the retry budget.
pub const MAX_RETRIES_ENV: &str = "SENTINEL_MAX_RETRIES";

/// Environment variable overriding the backoff time unit (e.g. `1s`, `250ms`).
pub const BACKOFF_UNIT_ENV: &str = "SENTINEL_BACKOFF_UNIT";

/// Environment variable overriding the per-request HTTP timeout.
pub const TIMEOUT_ENV: &str = "SENTINEL_TIMEOUT";

/// Default API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default retry budget: six attempts in total.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Errors from loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} not set: configure the '{var}' environment variable")]
    MissingCredential { var: String, name: String },

    #[error("Invalid value '{value}' for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

/// Settings for the structured-extraction client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL, without the `/models/...` suffix
    pub endpoint: String,

    /// Model to call
    pub model: String,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Backoff time unit; waits are 1, 2, 4, ... units
    pub backoff_unit: Duration,

    /// Request timeout enforced by the HTTP client
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load through a variable lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            config = config.with_endpoint(endpoint)?;
        }
        if let Some(model) = lookup(MODEL_ENV) {
            let model = model.trim();
            if model.is_empty() {
                return Err(invalid(MODEL_ENV, model, "model name is empty"));
            }
            config.model = model.to_string();
        }
        if let Some(raw) = lookup(MAX_RETRIES_ENV) {
            config.max_retries = raw
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(MAX_RETRIES_ENV, &raw, &e.to_string()))?;
        }
        if let Some(raw) = lookup(BACKOFF_UNIT_ENV) {
            config.backoff_unit = parse_duration(BACKOFF_UNIT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.timeout = parse_duration(TIMEOUT_ENV, &raw)?;
        }

        Ok(config)
    }

    /// Set the API base URL. Must be http or https.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into();
        let trimmed = endpoint.trim().trim_end_matches('/');
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(invalid(
                ENDPOINT_ENV,
                &endpoint,
                "endpoint must start with http:// or https://",
            ));
        }
        self.endpoint = trimmed.to_string();
        Ok(self)
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff time unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_unit)
    }
}

fn parse_duration(var: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| invalid(var, raw, &e.to_string()))
}

fn invalid(var: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
