//! HTTP client for the token service.
//!
//! Requests a join credential from `POST {base_url}/api/token`.

use crate::config::ClientConfig;
use crate::errors::SessionError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Connect timeout for token requests in seconds.
const TOKEN_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Request body for `POST /api/token`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
}

/// Credential returned by the token service.
///
/// `Debug` redacts the token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCredential {
    pub token: String,
    pub room_name: String,
    pub participant_name: String,
    pub livekit_url: String,
}

impl fmt::Debug for JoinCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinCredential")
            .field("token", &"[REDACTED]")
            .field("room_name", &self.room_name)
            .field("participant_name", &self.participant_name)
            .field("livekit_url", &self.livekit_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct TokenClient {
    client: Client,
    base_url: String,
}

impl TokenClient {
    /// Create a new token client.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(TOKEN_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "sc.token_client", error = %e, "Failed to build HTTP client");
                SessionError::Internal("failed to build HTTP client".to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, SessionError> {
        Self::new(
            config.token_service_url.clone(),
            config.token_request_timeout,
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request a credential. Absent names are filled in by the service.
    ///
    /// # Errors
    ///
    /// - `SessionError::Issuance` if the service is unreachable or refuses
    #[instrument(skip_all, fields(room = ?room_name))]
    pub async fn request_token(
        &self,
        room_name: Option<&str>,
        participant_name: Option<&str>,
    ) -> Result<JoinCredential, SessionError> {
        let url = format!("{}/api/token", self.base_url);
        let request = TokenRequest {
            room_name: room_name.map(str::to_string),
            participant_name: participant_name.map(str::to_string),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "sc.token_client", error = %e, "Token request failed");
                SessionError::Issuance(format!("token service unavailable: {e}"))
            })?;

        self.handle_response(response).await
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<JoinCredential, SessionError> {
        let status = response.status();

        if status.is_success() {
            return response.json().await.map_err(|e| {
                error!(target: "sc.token_client", error = %e, "Failed to parse token response");
                SessionError::Issuance("invalid token service response".to_string())
            });
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("token service returned {status}"),
        };
        warn!(target: "sc.token_client", status = %status, error = %message, "Token service refused request");
        Err(SessionError::Issuance(message))
    }
}
