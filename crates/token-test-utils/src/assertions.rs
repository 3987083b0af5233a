//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for access tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::{verify_access_token, AccessTokenClaims};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no segment {index}"));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {index}: {e}"))
}

fn claims_of(token: &str) -> AccessTokenClaims {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

/// Custom assertions for access tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject("alice")
///     .assert_for_session("demo")
///     .assert_has_full_capabilities()
///     .assert_expires_in(86_400);
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a well-formed HS256 JWT with readable claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token is for the specified participant identity
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert that the token grants the specified session
    fn assert_for_session(&self, session: &str) -> &Self;

    /// Assert that join, publish, subscribe and data capabilities are granted
    fn assert_has_full_capabilities(&self) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;

    /// Assert that the token verifies against the specified secret
    fn assert_signed_with(&self, secret: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header: JwtHeader =
            serde_json::from_slice(&segment(self, 0)).expect("Failed to parse JWT header JSON");
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        claims_of(self);

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims_of(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );
        self
    }

    fn assert_for_session(&self, session: &str) -> &Self {
        let claims = claims_of(self);
        assert_eq!(
            claims.video.room, session,
            "Expected session '{}', got '{}'",
            session, claims.video.room
        );
        self
    }

    fn assert_has_full_capabilities(&self) -> &Self {
        let video = claims_of(self).video;
        assert!(
            video.room_join && video.can_publish && video.can_subscribe && video.can_publish_data,
            "Expected full capabilities, got {:?}",
            video
        );
        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims = claims_of(self);
        let now = chrono::Utc::now().timestamp();
        let expires_in = claims.exp - now;

        // Allow 5-second tolerance for clock skew
        assert!(
            (expires_in - seconds as i64).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );
        self
    }

    fn assert_signed_with(&self, secret: &str) -> &Self {
        let result = verify_access_token(self, secret.as_bytes(), 0);
        assert!(
            result.is_ok(),
            "Token does not verify with the given secret: {:?}",
            result.err()
        );
        self
    }
}
