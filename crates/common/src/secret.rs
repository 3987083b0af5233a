//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the platform API secret and any
//! other key material. `SecretString` and `SecretBox<T>` implement `Debug`
//! with redaction, so a struct deriving `Debug` that holds one is safe to log.
//! Secrets are zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SigningConfig {
//!     api_key: String,
//!     api_secret: SecretString,
//! }
//!
//! let config = SigningConfig {
//!     api_key: "devkey".to_string(),
//!     api_secret: SecretString::from("devsecret"),
//! };
//!
//! // The secret is redacted in debug output
//! assert!(!format!("{config:?}").contains("devsecret"));
//!
//! // Access requires an explicit call
//! let raw: &str = config.api_secret.expose_secret();
//! assert_eq!(raw, "devsecret");
//! ```
//!
//! Use `SecretString` for API secrets and bearer tokens held in configuration.
//! Signed access tokens handed to participants are not secrets of the issuer
//! and travel as plain strings, but they are still never logged.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
