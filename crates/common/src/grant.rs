//! Immutable session grant model.
//!
//! A [`SessionGrant`] is the signed, time-bounded proof that a participant may
//! join a named session with a set of [`Capability`] values. The issuer builds
//! one right after signing; the client rebuilds one from the token it receives.
//! Either way the grant is read-only and cheap to clone, so it can be handed to
//! a session connection by value without any locking.

use crate::jwt::{self, AccessTokenClaims, JwtError, VideoGrant};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single permission inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Join the session.
    Join,
    /// Publish audio/video tracks.
    Publish,
    /// Subscribe to other participants' tracks.
    Subscribe,
    /// Publish data messages.
    PublishData,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 4] = [
        Capability::Join,
        Capability::Publish,
        Capability::Subscribe,
        Capability::PublishData,
    ];

    /// The full capability set granted to every participant.
    #[must_use]
    pub fn full_set() -> BTreeSet<Capability> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Join => write!(f, "join"),
            Capability::Publish => write!(f, "publish"),
            Capability::Subscribe => write!(f, "subscribe"),
            Capability::PublishData => write!(f, "publish_data"),
        }
    }
}

impl VideoGrant {
    /// Build the `video` claim for a session from a capability set.
    #[must_use]
    pub fn for_session(room: &str, capabilities: &BTreeSet<Capability>) -> Self {
        Self {
            room: room.to_string(),
            room_join: capabilities.contains(&Capability::Join),
            can_publish: capabilities.contains(&Capability::Publish),
            can_subscribe: capabilities.contains(&Capability::Subscribe),
            can_publish_data: capabilities.contains(&Capability::PublishData),
        }
    }

    /// The capabilities this claim grants.
    #[must_use]
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        let flags = [
            (self.room_join, Capability::Join),
            (self.can_publish, Capability::Publish),
            (self.can_subscribe, Capability::Subscribe),
            (self.can_publish_data, Capability::PublishData),
        ];

        flags
            .into_iter()
            .filter_map(|(granted, capability)| granted.then_some(capability))
            .collect()
    }
}

/// A signed, time-bounded authorization to join one session.
///
/// Invariant: `expires_at > issued_at`. Fields are private; the grant cannot
/// be modified after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionGrant {
    subject_identity: String,
    session_name: String,
    capabilities: BTreeSet<Capability>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    signature: Vec<u8>,
    token: String,
}

/// The token is a bearer credential and the signature is derived from it;
/// both are redacted.
impl fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGrant")
            .field("subject_identity", &self.subject_identity)
            .field("session_name", &self.session_name)
            .field("capabilities", &self.capabilities)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("signature", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl SessionGrant {
    /// Build a grant from claims and the compact token that was signed over them.
    ///
    /// # Errors
    ///
    /// - `InvalidClaims` if timestamps are out of range or `exp <= iat`
    /// - `MalformedToken` / `TokenTooLarge` if the signature cannot be extracted
    pub fn from_signed(claims: &AccessTokenClaims, token: String) -> Result<Self, JwtError> {
        if claims.exp <= claims.iat {
            tracing::debug!(
                target: "common.grant",
                iat = claims.iat,
                exp = claims.exp,
                "Grant rejected: expiry does not follow issuance"
            );
            return Err(JwtError::InvalidClaims);
        }

        let issued_at = DateTime::<Utc>::from_timestamp(claims.iat, 0).ok_or(JwtError::InvalidClaims)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(JwtError::InvalidClaims)?;
        let signature = jwt::signature_bytes(&token)?;

        Ok(Self {
            subject_identity: claims.sub.clone(),
            session_name: claims.video.room.clone(),
            capabilities: claims.video.capabilities(),
            issued_at,
            expires_at,
            signature,
            token,
        })
    }

    /// Rebuild a grant from a compact token without verifying it.
    ///
    /// The client does not hold the signing secret; the platform verifies the
    /// signature when the token is presented.
    ///
    /// # Errors
    ///
    /// Any [`JwtError`] from decoding or from [`SessionGrant::from_signed`].
    pub fn from_token(token: &str) -> Result<Self, JwtError> {
        let claims = jwt::decode_claims_unverified(token)?;
        Self::from_signed(&claims, token.to_string())
    }

    /// Participant identity the grant was issued to.
    #[must_use]
    pub fn subject_identity(&self) -> &str {
        &self.subject_identity
    }

    /// Session the grant authorizes.
    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Granted capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    /// Whether a capability is granted.
    #[must_use]
    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Lifetime of the grant (`expires_at - issued_at`).
    #[must_use]
    pub fn time_to_live(&self) -> Duration {
        self.expires_at - self.issued_at
    }

    /// Whether the grant is no longer valid at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// HMAC signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The compact token presented to the platform.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}
