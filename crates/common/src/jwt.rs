//! Access token claims and helpers shared by issuer and client.
//!
//! Tokens are HS256-signed JWTs in the layout the real-time platform expects:
//! the API key is the issuer, the participant identity is the subject, and a
//! `video` claim carries the session name and the granted capabilities.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only HS256 is accepted when verifying
//! - Error messages are generic; details are logged at debug level
//! - The `sub` field is redacted in `Debug` output

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted token size in bytes (8KB).
///
/// Typical access tokens are 300-500 bytes. Oversized input is rejected before
/// any base64 decoding or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default leeway applied to `exp`/`nbf` checks when verifying.
pub const DEFAULT_VERIFY_LEEWAY_SECONDS: u64 = 0;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding or verifying an access token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid")]
    TokenTooLarge,

    /// Not a three-part JWT, or a part is not valid base64/JSON.
    #[error("The access token is invalid")]
    MalformedToken,

    /// Signature does not match the shared secret.
    #[error("The access token is invalid")]
    InvalidSignature,

    /// `exp` is in the past or `nbf` is in the future.
    #[error("The access token is expired or not yet valid")]
    Expired,

    /// Claims are structurally valid JSON but semantically wrong
    /// (e.g. `exp <= iat`, out-of-range timestamps).
    #[error("The access token claims are invalid")]
    InvalidClaims,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Session-scoped permissions carried in the `video` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    /// Session (room) name this grant applies to.
    pub room: String,

    /// Permission to join the session.
    #[serde(default)]
    pub room_join: bool,

    /// Permission to publish media tracks.
    #[serde(default)]
    pub can_publish: bool,

    /// Permission to subscribe to other participants' tracks.
    #[serde(default)]
    pub can_subscribe: bool,

    /// Permission to publish data messages.
    #[serde(default)]
    pub can_publish_data: bool,
}

/// Access token claims.
///
/// # Fields
///
/// - `iss`: API key identifying the issuer to the platform
/// - `sub`: Participant identity (redacted in `Debug`)
/// - `iat` / `nbf` / `exp`: Unix epoch seconds
/// - `video`: Session grant
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer (platform API key).
    pub iss: String,

    /// Subject (participant identity) - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Session grant.
    pub video: VideoGrant,
}

impl fmt::Debug for AccessTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("video", &self.video)
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact JWT into its three segments after the size check.
fn split_token(token: &str) -> Result<(&str, &str, &str), JwtError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok((header, payload, signature))
        }
        _ => {
            tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
            Err(JwtError::MalformedToken)
        }
    }
}

/// Decode the claims of a token WITHOUT verifying its signature.
///
/// Used by the client, which never holds the signing secret, to learn which
/// identity and session a token it was handed refers to. The platform performs
/// the real verification at connect time.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds the size limit
/// - `MalformedToken` - Wrong structure, bad base64 or invalid claims JSON
pub fn decode_claims_unverified(token: &str) -> Result<AccessTokenClaims, JwtError> {
    let (_, payload, _) = split_token(token)?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtError::MalformedToken
    })?;

    serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT claims JSON");
        JwtError::MalformedToken
    })
}

/// Return the raw signature bytes of a compact token.
///
/// # Errors
///
/// Returns `TokenTooLarge` or `MalformedToken` for unusable input.
pub fn signature_bytes(token: &str) -> Result<Vec<u8>, JwtError> {
    let (_, _, signature) = split_token(token)?;

    URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT signature base64");
        JwtError::MalformedToken
    })
}

/// Verify a token against the shared secret and return its claims.
///
/// Checks the HS256 signature, `exp` and `nbf` (with `leeway_seconds`).
///
/// # Errors
///
/// - `TokenTooLarge` / `MalformedToken` - Unusable input
/// - `InvalidSignature` - Signed with a different secret
/// - `Expired` - Outside its validity window
pub fn verify_access_token(
    token: &str,
    secret: &[u8],
    leeway_seconds: u64,
) -> Result<AccessTokenClaims, JwtError> {
    split_token(token)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway_seconds;
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<AccessTokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => JwtError::Expired,
                _ => JwtError::MalformedToken,
            }
        })?;

    Ok(data.claims)
}
