//! Integration tests for `POST /api/token`
//!
//! Exercise the real router over HTTP and check the tokens against the shared
//! secret the platform would use.

use common::grant::{Capability, SessionGrant};
use reqwest::StatusCode;
use std::collections::HashSet;
use token_test_utils::{
    test_config_with, TestTokenServer, TokenAssertions, TEST_API_KEY, TEST_API_SECRET,
    TEST_LIVEKIT_URL,
};

// ============================================================================
// Issuance
// ============================================================================

#[tokio::test]
async fn test_issue_token_for_named_participant() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTokenServer::spawn().await?;

    // Act
    let (status, body) = server.request_token(Some("demo"), Some("alice")).await?;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roomName"], "demo");
    assert_eq!(body["participantName"], "alice");
    assert_eq!(body["livekitUrl"], TEST_LIVEKIT_URL);

    let token = body["token"].as_str().expect("token is a string").to_string();
    token
        .assert_valid_jwt()
        .assert_for_subject("alice")
        .assert_for_session("demo")
        .assert_has_full_capabilities()
        .assert_expires_in(86_400)
        .assert_signed_with(TEST_API_SECRET);

    let claims = common::jwt::decode_claims_unverified(&token)?;
    assert_eq!(claims.iss, TEST_API_KEY);

    Ok(())
}

#[tokio::test]
async fn test_grant_lifetime_is_exactly_ttl() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let (_, body) = server.request_token(Some("demo"), Some("alice")).await?;
    let grant = SessionGrant::from_token(body["token"].as_str().expect("token"))?;

    assert_eq!(grant.time_to_live(), chrono::Duration::hours(24));
    assert_eq!(grant.capabilities(), &Capability::full_set());

    Ok(())
}

#[tokio::test]
async fn test_token_does_not_verify_with_other_secret() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let (_, body) = server.request_token(Some("demo"), Some("alice")).await?;
    let token = body["token"].as_str().expect("token");

    assert!(common::jwt::verify_access_token(token, b"not-the-secret", 0).is_err());

    Ok(())
}

// ============================================================================
// Defaults
// ============================================================================

#[tokio::test]
async fn test_empty_request_gets_defaults() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let (status, body) = server.request_token(None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roomName"], "test-room");
    let participant = body["participantName"].as_str().expect("participant");
    assert!(participant.starts_with("user-"), "got {participant}");

    body["token"]
        .as_str()
        .expect("token")
        .to_string()
        .assert_for_subject(participant)
        .assert_for_session("test-room");

    Ok(())
}

#[tokio::test]
async fn test_empty_strings_are_treated_as_absent() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let (status, body) = server.request_token(Some(""), Some("")).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roomName"], "test-room");
    assert!(body["participantName"]
        .as_str()
        .expect("participant")
        .starts_with("user-"));

    Ok(())
}

#[tokio::test]
async fn test_generated_identities_are_unique() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let mut identities = HashSet::new();
    for _ in 0..20 {
        let (_, body) = server.request_token(Some("demo"), None).await?;
        identities.insert(body["participantName"].as_str().expect("participant").to_string());
    }

    assert_eq!(identities.len(), 20);

    Ok(())
}

#[tokio::test]
async fn test_configured_default_room_and_ttl() -> Result<(), anyhow::Error> {
    let config = test_config_with(&[("DEFAULT_ROOM_NAME", "lobby"), ("TOKEN_TTL_SECONDS", "300")]);
    let server = TestTokenServer::spawn_with_config(config).await?;

    let (_, body) = server.request_token(None, Some("alice")).await?;

    assert_eq!(body["roomName"], "lobby");
    body["token"]
        .as_str()
        .expect("token")
        .to_string()
        .assert_expires_in(300);

    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_reject_policy_returns_bad_request() -> Result<(), anyhow::Error> {
    let config = test_config_with(&[("REQUIRE_IDENTIFIERS", "true")]);
    let server = TestTokenServer::spawn_with_config(config).await?;

    let (status, body) = server.request_token(Some("demo"), None).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "participantName is required");
    assert!(body.get("token").is_none());

    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_client_error() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/token", server.url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;

    assert!(response.status().is_client_error());

    Ok(())
}
