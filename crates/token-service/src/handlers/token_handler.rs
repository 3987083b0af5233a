use crate::errors::IssuerError;
use crate::observability::metrics::record_token_issuance;
use crate::routes::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Body of `POST /api/token`. Both fields may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub room_name: String,
    pub participant_name: String,
    pub livekit_url: String,
}

/// Handle access token request
///
/// POST /api/token
#[tracing::instrument(skip_all, name = "ts.handlers.token")]
pub async fn handle_issue_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, IssuerError> {
    let start = Instant::now();

    let result = state
        .issuer
        .issue_grant(payload.room_name.as_deref(), payload.participant_name.as_deref());

    match result {
        Ok(issued) => {
            record_token_issuance("success", None, start.elapsed());

            Ok(Json(TokenResponse {
                token: issued.token().to_string(),
                room_name: issued.session_name,
                participant_name: issued.participant_identity,
                livekit_url: issued.platform_url,
            }))
        }
        Err(e) => {
            record_token_issuance("error", Some(e.category()), start.elapsed());
            tracing::warn!(target: "ts.handlers.token", error = %e, "Token request failed");
            Err(e)
        }
    }
}
