//! Fixed credentials for testing
//!
//! Every test shares the same API key and secret so tokens produced by the
//! issuer, the builders and the platform double all agree.

use std::collections::HashMap;
use token_service::config::Config;

/// API key used as the token issuer in tests.
pub const TEST_API_KEY: &str = "test-api-key";

/// Shared HS256 secret used in tests.
pub const TEST_API_SECRET: &str = "test-api-secret-0123456789abcdef";

/// Platform address returned by test servers.
pub const TEST_LIVEKIT_URL: &str = "ws://platform.test:7880";

/// Environment-style variables for a test configuration.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        ("LIVEKIT_API_KEY".to_string(), TEST_API_KEY.to_string()),
        ("LIVEKIT_API_SECRET".to_string(), TEST_API_SECRET.to_string()),
        ("LIVEKIT_URL".to_string(), TEST_LIVEKIT_URL.to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
    ])
}

/// Test configuration with the fixed credentials.
pub fn test_config() -> Config {
    test_config_with(&[])
}

/// Test configuration with extra variables layered on top.
///
/// # Panics
///
/// Panics if the resulting variables do not form a valid configuration.
pub fn test_config_with(extra: &[(&str, &str)]) -> Config {
    let mut vars = test_config_vars();
    for (name, value) in extra {
        vars.insert((*name).to_string(), (*value).to_string());
    }
    Config::from_vars(&vars).expect("test configuration should be valid")
}
