//! Session flow tests
//!
//! Drive the session actor and the client facade against the in-process
//! platform, and against a real token service for the join path.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use session_client::activity_log::{ActivityLog, Severity};
use session_client::actors::{
    ConnectionState, SessionConnectionActor, SessionConnectionHandle, SessionEvent,
};
use session_client::config::ClientConfig;
use session_client::errors::SessionError;
use session_client::platform::mock::MockPlatform;
use session_client::platform::{MediaKind, PlatformEvent, RealtimePlatform};
use session_client::SessionClient;
use std::sync::Arc;
use std::time::Duration;
use token_test_utils::{TestTokenBuilder, TestTokenServer, TEST_API_SECRET, TEST_LIVEKIT_URL};
use tokio_util::sync::CancellationToken;

const ADDRESS: &str = "ws://platform.test:7880";

fn spawn_session(platform: &Arc<MockPlatform>) -> SessionConnectionHandle {
    let platform: Arc<dyn RealtimePlatform> = platform.clone();
    let (handle, _task) =
        SessionConnectionActor::spawn(platform, ActivityLog::new(100), CancellationToken::new());
    handle
}

async fn connect_as(handle: &SessionConnectionHandle, identity: &str) {
    let grant = TestTokenBuilder::new()
        .for_participant(identity)
        .in_session("demo")
        .expires_in(3600)
        .grant();
    handle.connect(grant, ADDRESS).await.unwrap();
}

async fn wait_for_state(handle: &SessionConnectionHandle, expected: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.state().await.unwrap() != expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("state not reached in time");
}

async fn wait_for_camera_call(platform: &MockPlatform) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while platform.camera_calls() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("camera toggle never reached the platform");
}

fn peer(identity: &str) -> PlatformEvent {
    PlatformEvent::PeerJoined {
        identity: identity.to_string(),
    }
}

// ============================================================================
// Roster scenarios
// ============================================================================

#[tokio::test]
async fn test_connected_roster_contains_only_local() {
    let platform = Arc::new(MockPlatform::accepting());
    let handle = spawn_session(&platform);

    connect_as(&handle, "alice").await;

    let roster = handle.roster().await.unwrap();
    assert_eq!(roster.len(), 1);
    let alice = roster.first().unwrap();
    assert_eq!(alice.identity, "alice");
    assert!(alice.is_local);
}

#[tokio::test]
async fn test_peer_join_media_and_leave() {
    let platform = Arc::new(MockPlatform::accepting());
    let handle = spawn_session(&platform);
    connect_as(&handle, "alice").await;

    assert!(platform.inject(peer("bob")).await);
    let roster = handle.roster().await.unwrap();
    let identities: Vec<_> = roster.iter().map(|p| p.identity.clone()).collect();
    assert_eq!(identities, vec!["alice", "bob"]);
    let bob = roster.iter().find(|p| p.identity == "bob").unwrap();
    assert!(!bob.video_available && !bob.audio_available);

    platform
        .inject(PlatformEvent::MediaAvailable {
            identity: "bob".to_string(),
            kind: MediaKind::Video,
            track: None,
        })
        .await;
    let roster = handle.roster().await.unwrap();
    let bob = roster.iter().find(|p| p.identity == "bob").unwrap();
    assert!(bob.video_available);
    assert!(!bob.audio_available);

    platform
        .inject(PlatformEvent::PeerLeft {
            identity: "bob".to_string(),
        })
        .await;
    let roster = handle.roster().await.unwrap();
    let identities: Vec<_> = roster.iter().map(|p| p.identity.clone()).collect();
    assert_eq!(identities, vec!["alice"]);

    let messages = handle.activity_log().messages();
    assert!(messages.contains(&"Participant joined: bob".to_string()));
    assert!(messages.contains(&"Subscribed to video from bob".to_string()));
    assert!(messages.contains(&"Participant left: bob".to_string()));
}

#[tokio::test]
async fn test_media_before_join_is_dropped() {
    let platform = Arc::new(MockPlatform::accepting());
    let handle = spawn_session(&platform);
    connect_as(&handle, "alice").await;

    platform
        .inject(PlatformEvent::MediaAvailable {
            identity: "bob".to_string(),
            kind: MediaKind::Video,
            track: None,
        })
        .await;
    platform.inject(peer("bob")).await;

    let roster = handle.roster().await.unwrap();
    let flags: Vec<_> = roster
        .iter()
        .map(|p| (p.identity.clone(), p.video_available))
        .collect();
    assert_eq!(
        flags,
        vec![("alice".to_string(), false), ("bob".to_string(), false)]
    );
    assert!(!handle
        .activity_log()
        .messages()
        .contains(&"Subscribed to video from bob".to_string()));
}

#[tokio::test]
async fn test_events_arrive_after_connected() {
    let platform = Arc::new(MockPlatform::accepting().with_initial_peers(&["bob", "carol"]));
    let handle = spawn_session(&platform);
    let mut events = handle.subscribe();

    connect_as(&handle, "alice").await;
    handle.disconnect().await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert!(matches!(
        received.first(),
        Some(SessionEvent::Connected { .. })
    ));
    assert_eq!(received.last(), Some(&SessionEvent::Disconnected));
    let connected_count = received
        .iter()
        .filter(|e| matches!(e, SessionEvent::Connected { .. }))
        .count();
    assert_eq!(connected_count, 1);
}

// ============================================================================
// State machine
// ============================================================================

#[tokio::test]
async fn test_camera_toggle_while_disconnected_rejected() {
    let platform = Arc::new(MockPlatform::accepting());
    let handle = spawn_session(&platform);

    let result = handle.set_camera_enabled(true).await;

    assert!(matches!(
        result,
        Err(SessionError::InvalidState {
            state: ConnectionState::Disconnected,
            ..
        })
    ));
    assert!(!handle.media_state().await.unwrap().camera_enabled);
    assert_eq!(platform.camera_calls(), 0);
}

#[tokio::test]
async fn test_disconnect_mid_connect() {
    let platform = Arc::new(MockPlatform::accepting().gate_handshake());
    let handle = spawn_session(&platform);

    let connecting = {
        let handle = handle.clone();
        tokio::spawn(async move {
            let grant = TestTokenBuilder::new().for_participant("alice").grant();
            handle.connect(grant, ADDRESS).await
        })
    };
    wait_for_state(&handle, ConnectionState::Connecting).await;

    handle.disconnect().await.unwrap();
    platform.release_handshake();

    assert_eq!(
        connecting.await.unwrap(),
        Err(SessionError::ConnectionCancelled)
    );
    assert_eq!(handle.state().await.unwrap(), ConnectionState::Disconnected);
    assert!(handle.roster().await.unwrap().is_empty());

    let entries = handle.activity_log().snapshot();
    let disconnected = entries
        .iter()
        .filter(|e| e.message == "Disconnected from session")
        .count();
    assert_eq!(disconnected, 1);
    assert!(!entries
        .iter()
        .any(|e| e.message.starts_with("Connected to session")));
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let platform = Arc::new(MockPlatform::accepting());
    let handle = spawn_session(&platform);

    connect_as(&handle, "alice").await;
    handle.disconnect().await.unwrap();
    connect_as(&handle, "alice").await;

    assert_eq!(handle.state().await.unwrap(), ConnectionState::Connected);
    assert_eq!(platform.connect_calls(), 2);
}

#[tokio::test]
async fn test_closed_event_stream_disconnects() {
    let platform = Arc::new(MockPlatform::accepting());
    let handle = spawn_session(&platform);
    connect_as(&handle, "alice").await;

    platform.close_events();

    wait_for_state(&handle, ConnectionState::Disconnected).await;
    assert!(handle.roster().await.unwrap().is_empty());
}

// ============================================================================
// Media toggles
// ============================================================================

#[tokio::test]
async fn test_concurrent_same_kind_toggle_in_progress() {
    let platform = Arc::new(MockPlatform::accepting().gate_camera());
    let handle = spawn_session(&platform);
    connect_as(&handle, "alice").await;

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.set_camera_enabled(true).await })
    };
    wait_for_camera_call(&platform).await;

    // Same kind is refused, the other kind proceeds.
    assert_eq!(
        handle.set_camera_enabled(false).await,
        Err(SessionError::OperationInProgress(MediaKind::Video))
    );
    handle.set_microphone_enabled(true).await.unwrap();

    platform.release_camera();
    first.await.unwrap().unwrap();

    let media = handle.media_state().await.unwrap();
    assert!(media.camera_enabled);
    assert!(media.microphone_enabled);
}

#[tokio::test]
async fn test_toggle_failure_leaves_state_unchanged() {
    let platform = Arc::new(MockPlatform::accepting().fail_microphone());
    let handle = spawn_session(&platform);
    connect_as(&handle, "alice").await;

    let result = handle.set_microphone_enabled(true).await;

    assert!(matches!(
        result,
        Err(SessionError::ToggleFailed {
            kind: MediaKind::Audio,
            ..
        })
    ));
    assert!(!handle.media_state().await.unwrap().microphone_enabled);
    let entry = handle.activity_log().snapshot().pop().unwrap();
    assert_eq!(entry.severity, Severity::Error);
    assert!(entry.message.starts_with("Microphone error:"));
}

#[tokio::test]
async fn test_pending_toggle_resolved_on_disconnect() {
    let platform = Arc::new(MockPlatform::accepting().gate_camera());
    let handle = spawn_session(&platform);
    connect_as(&handle, "alice").await;

    let toggle = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.set_camera_enabled(true).await })
    };
    wait_for_camera_call(&platform).await;

    handle.disconnect().await.unwrap();

    assert!(matches!(
        toggle.await.unwrap(),
        Err(SessionError::InvalidState { .. })
    ));
    assert!(!handle.media_state().await.unwrap().camera_enabled);

    let entries = handle.activity_log().snapshot();
    let camera_error = entries
        .iter()
        .find(|e| e.message.starts_with("Camera error:"))
        .expect("cut-off toggle is logged");
    assert_eq!(camera_error.severity, Severity::Error);
    assert_eq!(
        camera_error.message,
        "Camera error: Cannot toggle camera while disconnected"
    );
}

// ============================================================================
// Join through the token service
// ============================================================================

fn client_config(server: &TestTokenServer) -> ClientConfig {
    ClientConfig {
        token_service_url: server.url(),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn test_join_with_issued_token() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let platform = Arc::new(MockPlatform::accepting().verifying(TEST_API_SECRET));
    let client = SessionClient::new(&client_config(&server), platform.clone())?;

    let credential = client.join(Some("demo"), Some("alice")).await?;

    assert_eq!(credential.room_name, "demo");
    assert_eq!(credential.participant_name, "alice");
    assert_eq!(platform.last_address().as_deref(), Some(TEST_LIVEKIT_URL));
    assert_eq!(
        client.connection().state().await?,
        ConnectionState::Connected
    );

    let messages = client.activity_log().messages();
    assert_eq!(
        messages,
        vec![
            "Generating token...".to_string(),
            "Token generated successfully".to_string(),
            format!("Connecting to {TEST_LIVEKIT_URL}..."),
            "Connected to session: demo".to_string(),
        ]
    );

    client.leave().await?;
    assert_eq!(
        client.connection().state().await?,
        ConnectionState::Disconnected
    );

    Ok(())
}

#[tokio::test]
async fn test_join_with_defaults() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let platform = Arc::new(MockPlatform::accepting().verifying(TEST_API_SECRET));
    let client = SessionClient::new(&client_config(&server), platform)?;

    let credential = client.join(None, None).await?;

    assert_eq!(credential.room_name, "test-room");
    assert!(credential.participant_name.starts_with("user-"));
    let roster = client.connection().roster().await?;
    assert_eq!(
        roster.first().map(|p| p.identity.clone()),
        Some(credential.participant_name)
    );

    Ok(())
}

#[tokio::test]
async fn test_join_rejected_by_platform_with_other_secret() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let platform = Arc::new(MockPlatform::accepting().verifying("some-other-secret"));
    let client = SessionClient::new(&client_config(&server), platform)?;

    let result = client.join(Some("demo"), Some("alice")).await;

    assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
    assert_eq!(
        client.connection().state().await?,
        ConnectionState::Disconnected
    );

    Ok(())
}

#[tokio::test]
async fn test_join_twice_rejected() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let platform = Arc::new(MockPlatform::accepting());
    let client = SessionClient::new(&client_config(&server), platform)?;

    client.join(Some("demo"), Some("alice")).await?;
    let result = client.join(Some("demo"), Some("alice")).await;

    assert!(matches!(result, Err(SessionError::InvalidState { .. })));

    Ok(())
}
