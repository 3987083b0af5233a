//! Token signing and randomness.
//!
//! Access tokens are HS256 JWTs signed with the platform API secret. The secret
//! is only exposed for the duration of the signing call.

use crate::errors::IssuerError;
use common::jwt::AccessTokenClaims;
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::instrument;

/// Radix of the identity suffix alphabet (`0-9a-z`).
const SUFFIX_RADIX: u8 = 36;

/// Largest multiple of [`SUFFIX_RADIX`] that fits in a byte. Bytes at or above
/// it are discarded so every symbol is equally likely.
const SUFFIX_REJECTION_LIMIT: u8 = 252;

/// Sign access token claims with the shared API secret (HS256).
///
/// # Errors
///
/// `IssuanceFailed` if the secret is empty or encoding fails.
#[instrument(skip_all)]
pub fn sign_access_token(
    claims: &AccessTokenClaims,
    secret: &SecretString,
) -> Result<String, IssuerError> {
    let secret_bytes = secret.expose_secret().as_bytes();
    if secret_bytes.is_empty() {
        tracing::error!(target: "ts.crypto", "Signing secret is empty");
        return Err(IssuerError::IssuanceFailed(
            "signing secret is not configured".to_string(),
        ));
    }

    let header = Header::new(Algorithm::HS256);

    encode(&header, claims, &EncodingKey::from_secret(secret_bytes)).map_err(|e| {
        tracing::error!(target: "ts.crypto", error = %e, "Token signing operation failed");
        IssuerError::IssuanceFailed(format!("token signing failed: {e}"))
    })
}

/// Generate a random lowercase alphanumeric string of `len` characters using
/// the system CSPRNG.
///
/// # Errors
///
/// `Internal` if the system RNG fails.
pub fn random_identity_suffix(len: usize) -> Result<String, IssuerError> {
    let rng = SystemRandom::new();
    let mut suffix = String::with_capacity(len);
    let mut buffer = [0u8; 16];

    while suffix.len() < len {
        rng.fill(&mut buffer).map_err(|_| {
            tracing::error!(target: "ts.crypto", "Failed to generate random bytes");
            IssuerError::Internal
        })?;

        for byte in buffer {
            if suffix.len() == len {
                break;
            }
            if byte >= SUFFIX_REJECTION_LIMIT {
                continue;
            }
            let symbol = char::from_digit(u32::from(byte % SUFFIX_RADIX), u32::from(SUFFIX_RADIX))
                .ok_or(IssuerError::Internal)?;
            suffix.push(symbol);
        }
    }

    Ok(suffix)
}
