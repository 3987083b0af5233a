//! Real-time media platform boundary.
//!
//! The session client never talks to a media server directly. It drives a
//! [`RealtimePlatform`] implementation and consumes the [`PlatformEvent`]
//! stream returned from a successful handshake.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Kind of media a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Name of the local device that produces this kind of media.
    #[must_use]
    pub fn device_label(&self) -> &'static str {
        match self {
            MediaKind::Video => "Camera",
            MediaKind::Audio => "Microphone",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Something a track can render into (a video element, an audio output).
pub trait MediaSink: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
}

/// Platform-owned media track.
///
/// Attaching the same sink twice is a no-op. Detaching an unknown sink is a
/// no-op.
pub trait TrackHandle: Send + Sync + fmt::Debug {
    fn sid(&self) -> &str;
    fn kind(&self) -> MediaKind;
    fn attach(&self, sink: Arc<dyn MediaSink>);
    fn detach(&self, sink_id: &str);
    fn attached_sinks(&self) -> Vec<String>;
}

pub type MediaTrack = Arc<dyn TrackHandle>;

/// Events delivered by the platform while a session is live.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    PeerJoined {
        identity: String,
    },
    PeerLeft {
        identity: String,
    },
    MediaAvailable {
        identity: String,
        kind: MediaKind,
        track: Option<MediaTrack>,
    },
    MediaUnavailable {
        identity: String,
        kind: MediaKind,
    },
    /// The platform ended the session on its own.
    Disconnected {
        reason: String,
    },
}

/// Receiving end of the platform event stream.
pub type PlatformEvents = mpsc::Receiver<PlatformEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Platform unreachable: {0}")]
    Unreachable(String),

    #[error("Platform rejected credential: {0}")]
    Rejected(String),

    #[error("{0}")]
    Device(String),

    #[error("Not connected to platform")]
    NotConnected,
}

/// Operations the session client needs from a real-time media platform.
#[async_trait]
pub trait RealtimePlatform: Send + Sync {
    /// Perform the handshake. On success the platform starts publishing
    /// events on the returned channel.
    async fn connect(&self, address: &str, token: &str) -> Result<PlatformEvents, PlatformError>;

    /// Leave the session. Must be safe to call while a handshake is running.
    async fn disconnect(&self);

    /// Enable or disable the local camera. Returns the local track when
    /// enabling produced one.
    async fn set_camera_enabled(&self, enabled: bool) -> Result<Option<MediaTrack>, PlatformError>;

    /// Enable or disable the local microphone.
    async fn set_microphone_enabled(
        &self,
        enabled: bool,
    ) -> Result<Option<MediaTrack>, PlatformError>;
}

/// In-process platform for tests and local development.
pub mod mock {
    use super::*;
    use common::jwt::verify_access_token;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, MutexGuard};
    use tokio::sync::Notify;

    const MOCK_EVENT_BUFFER: usize = 64;

    /// Track that records which sinks it is attached to.
    #[derive(Debug)]
    pub struct MockTrack {
        sid: String,
        kind: MediaKind,
        sinks: Mutex<Vec<String>>,
    }

    impl MockTrack {
        #[must_use]
        pub fn new(sid: impl Into<String>, kind: MediaKind) -> Self {
            Self {
                sid: sid.into(),
                kind,
                sinks: Mutex::new(Vec::new()),
            }
        }

        /// Create a shared track ready to hand to the session.
        #[must_use]
        pub fn shared(sid: impl Into<String>, kind: MediaKind) -> MediaTrack {
            Arc::new(Self::new(sid, kind))
        }

        fn sinks(&self) -> MutexGuard<'_, Vec<String>> {
            self.sinks.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl TrackHandle for MockTrack {
        fn sid(&self) -> &str {
            &self.sid
        }

        fn kind(&self) -> MediaKind {
            self.kind
        }

        fn attach(&self, sink: Arc<dyn MediaSink>) {
            let mut sinks = self.sinks();
            if !sinks.iter().any(|s| s == sink.id()) {
                sinks.push(sink.id().to_string());
            }
        }

        fn detach(&self, sink_id: &str) {
            self.sinks().retain(|s| s != sink_id);
        }

        fn attached_sinks(&self) -> Vec<String> {
            self.sinks().clone()
        }
    }

    /// Sink identified only by name.
    #[derive(Debug, Clone)]
    pub struct MockSink(pub String);

    impl MediaSink for MockSink {
        fn id(&self) -> &str {
            &self.0
        }
    }

    #[derive(Debug, Clone)]
    enum ConnectBehavior {
        Accept,
        Reject(String),
        Unreachable(String),
    }

    #[derive(Debug, Default)]
    struct MockState {
        events: Option<mpsc::Sender<PlatformEvent>>,
        last_token: Option<String>,
        last_address: Option<String>,
        failing_devices: HashSet<&'static str>,
    }

    /// Scriptable [`RealtimePlatform`].
    ///
    /// # Example
    /// ```rust,ignore
    /// let platform = Arc::new(MockPlatform::accepting().with_initial_peers(&["bob"]));
    /// // ... connect a session ...
    /// platform.inject(PlatformEvent::PeerLeft { identity: "bob".into() }).await;
    /// ```
    #[derive(Debug)]
    pub struct MockPlatform {
        behavior: ConnectBehavior,
        initial_peers: Vec<String>,
        secret: Option<Vec<u8>>,
        handshake_gate: Option<Arc<Notify>>,
        camera_gate: Option<Arc<Notify>>,
        state: Mutex<MockState>,
        connect_calls: AtomicUsize,
        disconnect_calls: AtomicUsize,
        camera_calls: AtomicUsize,
        microphone_calls: AtomicUsize,
        track_counter: AtomicUsize,
    }

    impl MockPlatform {
        fn with_behavior(behavior: ConnectBehavior) -> Self {
            Self {
                behavior,
                initial_peers: Vec::new(),
                secret: None,
                handshake_gate: None,
                camera_gate: None,
                state: Mutex::new(MockState::default()),
                connect_calls: AtomicUsize::new(0),
                disconnect_calls: AtomicUsize::new(0),
                camera_calls: AtomicUsize::new(0),
                microphone_calls: AtomicUsize::new(0),
                track_counter: AtomicUsize::new(0),
            }
        }

        /// Platform that accepts every handshake.
        #[must_use]
        pub fn accepting() -> Self {
            Self::with_behavior(ConnectBehavior::Accept)
        }

        /// Platform that refuses every credential.
        #[must_use]
        pub fn rejecting(reason: impl Into<String>) -> Self {
            Self::with_behavior(ConnectBehavior::Reject(reason.into()))
        }

        /// Platform that cannot be reached.
        #[must_use]
        pub fn unreachable(reason: impl Into<String>) -> Self {
            Self::with_behavior(ConnectBehavior::Unreachable(reason.into()))
        }

        /// Peers announced as `PeerJoined` right after the handshake.
        #[must_use]
        pub fn with_initial_peers(mut self, peers: &[&str]) -> Self {
            self.initial_peers = peers.iter().map(|p| (*p).to_string()).collect();
            self
        }

        /// Reject tokens that do not verify with `secret`.
        #[must_use]
        pub fn verifying(mut self, secret: &str) -> Self {
            self.secret = Some(secret.as_bytes().to_vec());
            self
        }

        /// Hold every handshake until [`release_handshake`](Self::release_handshake).
        #[must_use]
        pub fn gate_handshake(mut self) -> Self {
            self.handshake_gate = Some(Arc::new(Notify::new()));
            self
        }

        pub fn release_handshake(&self) {
            if let Some(gate) = &self.handshake_gate {
                gate.notify_one();
            }
        }

        /// Hold every camera toggle until [`release_camera`](Self::release_camera).
        #[must_use]
        pub fn gate_camera(mut self) -> Self {
            self.camera_gate = Some(Arc::new(Notify::new()));
            self
        }

        pub fn release_camera(&self) {
            if let Some(gate) = &self.camera_gate {
                gate.notify_one();
            }
        }

        /// Make every camera toggle fail.
        #[must_use]
        pub fn fail_camera(self) -> Self {
            self.lock().failing_devices.insert("camera");
            self
        }

        /// Make every microphone toggle fail.
        #[must_use]
        pub fn fail_microphone(self) -> Self {
            self.lock().failing_devices.insert("microphone");
            self
        }

        /// Deliver an event to the connected session.
        ///
        /// Returns false when no session is listening.
        pub async fn inject(&self, event: PlatformEvent) -> bool {
            let sender = self.lock().events.clone();
            match sender {
                Some(tx) => tx.send(event).await.is_ok(),
                None => false,
            }
        }

        /// Drop the event stream as if the transport went away.
        pub fn close_events(&self) {
            self.lock().events = None;
        }

        #[must_use]
        pub fn connect_calls(&self) -> usize {
            self.connect_calls.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn disconnect_calls(&self) -> usize {
            self.disconnect_calls.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn camera_calls(&self) -> usize {
            self.camera_calls.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn microphone_calls(&self) -> usize {
            self.microphone_calls.load(Ordering::SeqCst)
        }

        /// Token presented on the most recent handshake.
        #[must_use]
        pub fn last_token(&self) -> Option<String> {
            self.lock().last_token.clone()
        }

        /// Address used on the most recent handshake.
        #[must_use]
        pub fn last_address(&self) -> Option<String> {
            self.lock().last_address.clone()
        }

        fn lock(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn toggle(
            &self,
            device: &'static str,
            kind: MediaKind,
            enabled: bool,
        ) -> Result<Option<MediaTrack>, PlatformError> {
            let state = self.lock();
            if state.events.is_none() {
                return Err(PlatformError::NotConnected);
            }
            if state.failing_devices.contains(device) {
                return Err(PlatformError::Device(format!("{device} unavailable")));
            }
            drop(state);

            if !enabled {
                return Ok(None);
            }

            let n = self.track_counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(MockTrack::shared(format!("TR_local_{device}_{n}"), kind)))
        }
    }

    #[async_trait]
    impl RealtimePlatform for MockPlatform {
        async fn connect(
            &self,
            address: &str,
            token: &str,
        ) -> Result<PlatformEvents, PlatformError> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut state = self.lock();
                state.last_token = Some(token.to_string());
                state.last_address = Some(address.to_string());
            }

            if let Some(gate) = &self.handshake_gate {
                gate.notified().await;
            }

            match &self.behavior {
                ConnectBehavior::Accept => {}
                ConnectBehavior::Reject(reason) => {
                    return Err(PlatformError::Rejected(reason.clone()))
                }
                ConnectBehavior::Unreachable(reason) => {
                    return Err(PlatformError::Unreachable(reason.clone()))
                }
            }

            if let Some(secret) = &self.secret {
                verify_access_token(token, secret, 0)
                    .map_err(|e| PlatformError::Rejected(e.to_string()))?;
            }

            let (tx, rx) = mpsc::channel(MOCK_EVENT_BUFFER);
            for identity in &self.initial_peers {
                // Fresh channel with capacity above any realistic initial roster.
                let _ = tx.try_send(PlatformEvent::PeerJoined {
                    identity: identity.clone(),
                });
            }
            self.lock().events = Some(tx);

            Ok(rx)
        }

        async fn disconnect(&self) {
            self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
            self.lock().events = None;
        }

        async fn set_camera_enabled(
            &self,
            enabled: bool,
        ) -> Result<Option<MediaTrack>, PlatformError> {
            self.camera_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.camera_gate {
                gate.notified().await;
            }
            self.toggle("camera", MediaKind::Video, enabled)
        }

        async fn set_microphone_enabled(
            &self,
            enabled: bool,
        ) -> Result<Option<MediaTrack>, PlatformError> {
            self.microphone_calls.fetch_add(1, Ordering::SeqCst);
            self.toggle("microphone", MediaKind::Audio, enabled)
        }
    }
}
