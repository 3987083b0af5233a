//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating signed access tokens with arbitrary
//! claims, including ones the issuer would never produce (expired, partial
//! capabilities, foreign secrets).

use crate::crypto_fixtures::{TEST_API_KEY, TEST_API_SECRET};
use chrono::{Duration, Utc};
use common::grant::{Capability, SessionGrant};
use common::jwt::{AccessTokenClaims, VideoGrant};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::collections::BTreeSet;

/// Builder for signed test access tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_participant("alice")
///     .in_session("demo")
///     .expires_in(3600)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    iss: String,
    sub: String,
    room: String,
    capabilities: BTreeSet<Capability>,
    iat: i64,
    exp: i64,
    secret: String,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: TEST_API_KEY.to_string(),
            sub: "test-participant".to_string(),
            room: "test-room".to_string(),
            capabilities: Capability::full_set(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(24)).timestamp(),
            secret: TEST_API_SECRET.to_string(),
        }
    }

    /// Set the participant identity (`sub`)
    pub fn for_participant(mut self, identity: &str) -> Self {
        self.sub = identity.to_string();
        self
    }

    /// Set the session name (`video.room`)
    pub fn in_session(mut self, room: &str) -> Self {
        self.room = room.to_string();
        self
    }

    /// Replace the granted capabilities
    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.iter().copied().collect();
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        let now = Utc::now();
        self.exp = (now + Duration::seconds(seconds)).timestamp();
        if self.exp <= self.iat {
            self.iat = self.exp - 60;
        }
        self
    }

    /// Sign with a different secret
    pub fn signed_with(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// Build the claims
    pub fn claims(&self) -> AccessTokenClaims {
        AccessTokenClaims {
            iss: self.iss.clone(),
            sub: self.sub.clone(),
            iat: self.iat,
            nbf: self.iat,
            exp: self.exp,
            video: VideoGrant::for_session(&self.room, &self.capabilities),
        }
    }

    /// Sign the claims into a compact token
    pub fn sign(self) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &self.claims(),
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("test token should sign")
    }

    /// Sign and read the token back as a grant
    pub fn grant(self) -> SessionGrant {
        let token = self.sign();
        SessionGrant::from_token(&token).expect("test token should form a grant")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::jwt::{verify_access_token, JwtError};

    #[test]
    fn test_builder_defaults_form_valid_grant() {
        let grant = TestTokenBuilder::new().grant();

        assert_eq!(grant.subject_identity(), "test-participant");
        assert_eq!(grant.session_name(), "test-room");
        assert_eq!(grant.capabilities(), &Capability::full_set());
        assert!(!grant.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expired_builder_keeps_expiry_after_issuance() {
        let grant = TestTokenBuilder::new().expires_in(-300).grant();

        assert!(grant.is_expired_at(Utc::now()));
        assert!(grant.expires_at() > grant.issued_at());
    }

    #[test]
    fn test_signed_with_other_secret_fails_verification() {
        let token = TestTokenBuilder::new().signed_with("other").sign();

        assert_eq!(
            verify_access_token(&token, TEST_API_SECRET.as_bytes(), 0),
            Err(JwtError::InvalidSignature)
        );
    }

    #[test]
    fn test_partial_capabilities() {
        let grant = TestTokenBuilder::new()
            .with_capabilities(&[Capability::Join, Capability::Subscribe])
            .grant();

        assert!(grant.allows(Capability::Join));
        assert!(!grant.allows(Capability::Publish));
    }
}
