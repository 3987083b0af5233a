//! Credential issuance.
//!
//! [`GrantIssuer`] turns a (session, participant) pair into a signed
//! [`SessionGrant`]. It holds configuration only; every call is independent
//! and the issuer can be shared freely across request handlers.

use crate::config::Config;
use crate::crypto;
use crate::errors::IssuerError;
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use common::grant::{Capability, SessionGrant};
use common::jwt::{AccessTokenClaims, VideoGrant};
use common::secret::SecretString;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Prefix of generated participant identities.
pub const IDENTITY_PREFIX: &str = "user-";

/// Length of the random part of a generated identity.
pub const IDENTITY_SUFFIX_LEN: usize = 6;

/// What to do when a request omits the session name or participant identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierPolicy {
    /// Fill in the default session name or a generated identity.
    #[default]
    Substitute,
    /// Fail with `InvalidArgument`.
    Reject,
}

/// Source of participant identities for requests that do not name one.
pub trait IdentityGenerator: Send + Sync {
    fn generate(&self) -> Result<String, IssuerError>;
}

/// `user-` followed by a CSPRNG-backed lowercase alphanumeric suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentityGenerator;

impl IdentityGenerator for RandomIdentityGenerator {
    fn generate(&self) -> Result<String, IssuerError> {
        let suffix = crypto::random_identity_suffix(IDENTITY_SUFFIX_LEN)?;
        Ok(format!("{IDENTITY_PREFIX}{suffix}"))
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct IssuedGrant {
    pub grant: SessionGrant,
    /// Session name actually used (after defaulting).
    pub session_name: String,
    /// Participant identity actually used (after defaulting).
    pub participant_identity: String,
    /// Platform address the client should connect to.
    pub platform_url: String,
    /// Whether any identifier was filled in by the issuer.
    pub defaults_applied: bool,
}

impl IssuedGrant {
    /// Compact signed token.
    pub fn token(&self) -> &str {
        self.grant.token()
    }
}

#[derive(Clone)]
pub struct GrantIssuer {
    api_key: String,
    api_secret: SecretString,
    platform_url: String,
    ttl_seconds: i64,
    default_session_name: String,
    policy: IdentifierPolicy,
    identities: Arc<dyn IdentityGenerator>,
}

impl fmt::Debug for GrantIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantIssuer")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("platform_url", &self.platform_url)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("default_session_name", &self.default_session_name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GrantIssuer {
    /// Create an issuer with the default TTL, session name and policy.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: SecretString,
        platform_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
            platform_url: platform_url.into(),
            ttl_seconds: seconds_as_i64(crate::config::DEFAULT_TOKEN_TTL_SECONDS),
            default_session_name: crate::config::DEFAULT_ROOM_NAME.to_string(),
            policy: IdentifierPolicy::default(),
            identities: Arc::new(RandomIdentityGenerator),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_key.clone(),
            config.api_secret.clone(),
            config.livekit_url.clone(),
        )
        .with_ttl_seconds(config.token_ttl_seconds)
        .with_default_session_name(config.default_room_name.clone())
        .with_policy(config.identifier_policy)
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = seconds_as_i64(ttl_seconds);
        self
    }

    #[must_use]
    pub fn with_default_session_name(mut self, name: impl Into<String>) -> Self {
        self.default_session_name = name.into();
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_identity_generator(mut self, identities: Arc<dyn IdentityGenerator>) -> Self {
        self.identities = identities;
        self
    }

    pub fn policy(&self) -> IdentifierPolicy {
        self.policy
    }

    /// Issue a grant valid from now for the configured TTL.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` - an identifier is empty and the policy is `Reject`
    /// - `IssuanceFailed` - signing failed or the secret is unusable
    /// - `Internal` - identity generation failed
    pub fn issue_grant(
        &self,
        session_name: Option<&str>,
        participant_identity: Option<&str>,
    ) -> Result<IssuedGrant, IssuerError> {
        self.issue_grant_at(session_name, participant_identity, Utc::now())
    }

    /// Issue a grant as of `now`.
    #[instrument(skip_all, name = "ts.services.grant.issue")]
    pub fn issue_grant_at(
        &self,
        session_name: Option<&str>,
        participant_identity: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedGrant, IssuerError> {
        let (session_name, room_defaulted) = match non_empty(session_name) {
            Some(name) => (name.to_string(), false),
            None => match self.policy {
                IdentifierPolicy::Substitute => {
                    metrics::record_identifier_default("room");
                    (self.default_session_name.clone(), true)
                }
                IdentifierPolicy::Reject => {
                    return Err(IssuerError::InvalidArgument(
                        "roomName is required".to_string(),
                    ));
                }
            },
        };

        let (participant_identity, identity_defaulted) = match non_empty(participant_identity) {
            Some(identity) => (identity.to_string(), false),
            None => match self.policy {
                IdentifierPolicy::Substitute => {
                    metrics::record_identifier_default("participant");
                    (self.identities.generate()?, true)
                }
                IdentifierPolicy::Reject => {
                    return Err(IssuerError::InvalidArgument(
                        "participantName is required".to_string(),
                    ));
                }
            },
        };

        let issued_at = now.timestamp();
        let expires_at = issued_at.checked_add(self.ttl_seconds).ok_or_else(|| {
            IssuerError::IssuanceFailed("token lifetime overflows the clock".to_string())
        })?;

        let claims = AccessTokenClaims {
            iss: self.api_key.clone(),
            sub: participant_identity.clone(),
            iat: issued_at,
            nbf: issued_at,
            exp: expires_at,
            video: VideoGrant::for_session(&session_name, &Capability::full_set()),
        };

        let token = crypto::sign_access_token(&claims, &self.api_secret)?;

        let grant = SessionGrant::from_signed(&claims, token).map_err(|e| {
            tracing::error!(target: "ts.services.grant", error = %e, "Signed token could not be read back");
            IssuerError::IssuanceFailed(format!("signed token is unusable: {e}"))
        })?;

        let defaults_applied = room_defaulted || identity_defaulted;

        tracing::info!(
            target: "ts.services.grant",
            room = %session_name,
            defaults_applied,
            ttl_seconds = self.ttl_seconds,
            "Access token issued"
        );

        Ok(IssuedGrant {
            grant,
            session_name,
            participant_identity,
            platform_url: self.platform_url.clone(),
            defaults_applied,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn seconds_as_i64(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}
