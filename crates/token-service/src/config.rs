use crate::services::grant_service::IdentifierPolicy;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3001;

/// Platform address handed back to clients when `LIVEKIT_URL` is unset.
pub const DEFAULT_LIVEKIT_URL: &str = "ws://localhost:7880";

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 86_400;

/// Session name used when a request names none.
pub const DEFAULT_ROOM_NAME: &str = "test-room";

/// Token service configuration.
///
/// `api_secret` is a `SecretString`, so the derived `Debug` output redacts it.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub api_key: String,
    pub api_secret: SecretString,
    pub livekit_url: String,
    pub token_ttl_seconds: u64,
    pub default_room_name: String,
    pub identifier_policy: IdentifierPolicy,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let api_key = required(vars, "LIVEKIT_API_KEY")?;
        let api_secret = SecretString::from(required(vars, "LIVEKIT_API_SECRET")?);

        let livekit_url = vars
            .get("LIVEKIT_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LIVEKIT_URL.to_string());

        let port = match vars.get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                ConfigError::InvalidValue("PORT".to_string(), e.to_string())
            })?,
            None => DEFAULT_PORT,
        };

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| format!("0.0.0.0:{port}"));

        let token_ttl_seconds = match vars.get("TOKEN_TTL_SECONDS") {
            Some(raw) => {
                let ttl = raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidValue("TOKEN_TTL_SECONDS".to_string(), e.to_string())
                })?;
                if ttl == 0 {
                    return Err(ConfigError::InvalidValue(
                        "TOKEN_TTL_SECONDS".to_string(),
                        "must be greater than zero".to_string(),
                    ));
                }
                ttl
            }
            None => DEFAULT_TOKEN_TTL_SECONDS,
        };

        let default_room_name = vars
            .get("DEFAULT_ROOM_NAME")
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_ROOM_NAME.to_string());

        let identifier_policy = match vars.get("REQUIRE_IDENTIFIERS") {
            Some(raw) if parse_flag(raw, "REQUIRE_IDENTIFIERS")? => IdentifierPolicy::Reject,
            _ => IdentifierPolicy::Substitute,
        };

        let static_dir = vars
            .get("STATIC_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            bind_address,
            api_key,
            api_secret,
            livekit_url,
            token_ttl_seconds,
            default_room_name,
            identifier_policy,
            static_dir,
        })
    }
}

/// A present-but-empty value counts as missing.
fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_flag(raw: &str, name: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
