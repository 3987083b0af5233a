//! Session client configuration.
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for a token service running on the same machine.

use crate::activity_log::DEFAULT_ACTIVITY_LOG_CAPACITY;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default base URL of the token service.
pub const DEFAULT_TOKEN_SERVICE_URL: &str = "http://localhost:3001";

/// Default timeout for token requests in seconds.
pub const DEFAULT_TOKEN_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Session client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the token service (default: "http://localhost:3001").
    pub token_service_url: String,

    /// Maximum number of activity log entries kept (default: 500).
    pub activity_log_capacity: usize,

    /// Timeout for a single token request (default: 10s).
    pub token_request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_service_url: DEFAULT_TOKEN_SERVICE_URL.to_string(),
            activity_log_capacity: DEFAULT_ACTIVITY_LOG_CAPACITY,
            token_request_timeout: Duration::from_secs(DEFAULT_TOKEN_REQUEST_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_service_url = vars
            .get("TOKEN_SERVICE_URL")
            .filter(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TOKEN_SERVICE_URL.to_string());

        let activity_log_capacity =
            parse_positive(vars, "ACTIVITY_LOG_CAPACITY", DEFAULT_ACTIVITY_LOG_CAPACITY as u64)?;
        let activity_log_capacity = usize::try_from(activity_log_capacity).map_err(|e| {
            ConfigError::InvalidValue("ACTIVITY_LOG_CAPACITY".to_string(), e.to_string())
        })?;

        let timeout_seconds = parse_positive(
            vars,
            "TOKEN_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_TOKEN_REQUEST_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            token_service_url,
            activity_log_capacity,
            token_request_timeout: Duration::from_secs(timeout_seconds),
        })
    }
}

fn parse_positive(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value = raw
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))?;

    if value == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }

    Ok(value)
}
