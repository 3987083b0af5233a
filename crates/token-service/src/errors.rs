use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to clients for every server-side issuance failure.
pub const ISSUANCE_FAILED_MESSAGE: &str = "Failed to generate token";

#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Token issuance failed: {0}")]
    IssuanceFailed(String),

    #[error("Internal server error")]
    Internal,
}

impl IssuerError {
    /// Bounded label for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            IssuerError::InvalidArgument(_) => "invalid_argument",
            IssuerError::IssuanceFailed(_) => "issuance_failed",
            IssuerError::Internal => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            IssuerError::InvalidArgument(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            IssuerError::IssuanceFailed(reason) => {
                tracing::error!(target: "ts.errors", reason = %reason, "Error generating token");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ISSUANCE_FAILED_MESSAGE.to_string(),
                )
            }
            IssuerError::Internal => {
                tracing::error!(target: "ts.errors", "Internal error generating token");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ISSUANCE_FAILED_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
