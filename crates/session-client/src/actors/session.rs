//! `SessionConnectionActor` - one client connection to a real-time session.
//!
//! The actor owns the connection state, the roster and the local media
//! toggles. Platform calls that may take a while (the handshake, device
//! toggles) run as separate tasks and report back through an outcome channel
//! tagged with the epoch they were started in, so every state change happens
//! inside the actor loop.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --connect--> Connecting --handshake ok--> Connected
//!      ^                        |                            |
//!      +----handshake failed----+                            |
//!      +----disconnect----------+----disconnect / lost-------+
//! ```

use crate::activity_log::{ActivityLog, Severity};
use crate::errors::SessionError;
use crate::platform::{
    MediaKind, MediaTrack, PlatformError, PlatformEvent, PlatformEvents, RealtimePlatform,
};
use crate::roster::{Participant, RosterTracker};

use super::messages::{ConnectionState, LocalMediaState, SessionEvent, SessionMessage};

use chrono::Utc;
use common::grant::SessionGrant;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 64;

/// Channel buffer size for handshake and toggle outcomes.
const OUTCOME_CHANNEL_BUFFER: usize = 16;

/// Broadcast capacity for session events. Slow subscribers lag, they never
/// block the actor.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle to a `SessionConnectionActor`.
#[derive(Clone, Debug)]
pub struct SessionConnectionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    events: broadcast::Sender<SessionEvent>,
    activity: ActivityLog,
}

impl SessionConnectionHandle {
    /// Connect to the session named in `grant`.
    ///
    /// Resolves once the handshake has finished, failed or been cancelled by
    /// a [`disconnect`](Self::disconnect).
    pub async fn connect(
        &self,
        grant: SessionGrant,
        platform_address: impl Into<String>,
    ) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Connect {
            grant,
            platform_address: platform_address.into(),
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| self.internal(format!("response receive failed: {e}")))?
    }

    /// Leave the session. No-op while disconnected.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Disconnect { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| self.internal(format!("response receive failed: {e}")))
    }

    pub async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.set_media_enabled(MediaKind::Video, enabled).await
    }

    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.set_media_enabled(MediaKind::Audio, enabled).await
    }

    async fn set_media_enabled(&self, kind: MediaKind, enabled: bool) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::SetMediaEnabled {
            kind,
            enabled,
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| self.internal(format!("response receive failed: {e}")))?
    }

    /// Current connection state.
    pub async fn state(&self) -> Result<ConnectionState, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::GetState { respond_to: tx }).await?;

        rx.await
            .map_err(|e| self.internal(format!("response receive failed: {e}")))
    }

    /// Participants in arrival order, local participant first.
    pub async fn roster(&self) -> Result<Vec<Participant>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::GetRoster { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| self.internal(format!("response receive failed: {e}")))
    }

    pub async fn media_state(&self) -> Result<LocalMediaState, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::GetMediaState { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| self.internal(format!("response receive failed: {e}")))
    }

    /// Subscribe to session events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity
    }

    /// Cancel the session actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn send(&self, message: SessionMessage) -> Result<(), SessionError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| self.internal(format!("channel send failed: {e}")))
    }

    /// Record a lost actor in the activity log before surfacing it.
    fn internal(&self, reason: String) -> SessionError {
        let err = SessionError::Internal(reason);
        self.activity
            .append(format!("Session error: {err}"), Severity::Error);
        err
    }
}

/// Result of a task spawned by the actor.
enum TaskOutcome {
    Handshake {
        epoch: u64,
        result: Result<PlatformEvents, PlatformError>,
    },
    Toggle {
        epoch: u64,
        kind: MediaKind,
        enabled: bool,
        result: Result<Option<MediaTrack>, PlatformError>,
    },
}

struct PendingToggle {
    respond_to: oneshot::Sender<Result<(), SessionError>>,
    task: JoinHandle<()>,
}

/// The `SessionConnectionActor` implementation.
pub struct SessionConnectionActor {
    platform: Arc<dyn RealtimePlatform>,
    receiver: mpsc::Receiver<SessionMessage>,
    cancel_token: CancellationToken,
    activity: ActivityLog,
    events: broadcast::Sender<SessionEvent>,
    outcome_tx: mpsc::Sender<TaskOutcome>,
    outcome_rx: mpsc::Receiver<TaskOutcome>,
    state: ConnectionState,
    /// Incremented on every connect attempt and teardown.
    epoch: u64,
    grant: Option<SessionGrant>,
    roster: RosterTracker,
    media: LocalMediaState,
    /// Present only while Connected.
    platform_events: Option<PlatformEvents>,
    pending_connect: Option<oneshot::Sender<Result<(), SessionError>>>,
    handshake_task: Option<JoinHandle<()>>,
    pending_toggles: HashMap<MediaKind, PendingToggle>,
}

impl SessionConnectionActor {
    /// Spawn a new session actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        platform: Arc<dyn RealtimePlatform>,
        activity: ActivityLog,
        cancel_token: CancellationToken,
    ) -> (SessionConnectionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_BUFFER);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let actor = Self {
            platform,
            receiver,
            cancel_token: cancel_token.clone(),
            activity: activity.clone(),
            events: events.clone(),
            outcome_tx,
            outcome_rx,
            state: ConnectionState::Disconnected,
            epoch: 0,
            grant: None,
            roster: RosterTracker::new(),
            media: LocalMediaState::default(),
            platform_events: None,
            pending_connect: None,
            handshake_task: None,
            pending_toggles: HashMap::new(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionConnectionHandle {
            sender,
            cancel_token,
            events,
            activity,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "sc.actor.session")]
    async fn run(mut self) {
        debug!(target: "sc.actor.session", "SessionConnectionActor started");

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "sc.actor.session",
                        "SessionConnectionActor received cancellation signal"
                    );
                    if self.state != ConnectionState::Disconnected {
                        self.teardown(true).await;
                    }
                    break;
                }

                Some(outcome) = self.outcome_rx.recv() => {
                    self.handle_outcome(outcome);
                }

                event = next_platform_event(&mut self.platform_events) => {
                    match event {
                        Some(event) => self.handle_platform_event(event).await,
                        None => {
                            debug!(
                                target: "sc.actor.session",
                                "Platform event stream closed"
                            );
                            self.teardown(false).await;
                        }
                    }
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!(
                                target: "sc.actor.session",
                                "All handles dropped, stopping"
                            );
                            if self.state != ConnectionState::Disconnected {
                                self.teardown(true).await;
                            }
                            break;
                        }
                    }
                }
            }
        }

        debug!(target: "sc.actor.session", "SessionConnectionActor stopped");
    }

    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Connect {
                grant,
                platform_address,
                respond_to,
            } => self.handle_connect(grant, platform_address, respond_to),

            SessionMessage::Disconnect { respond_to } => {
                if self.state == ConnectionState::Disconnected {
                    debug!(target: "sc.actor.session", "Disconnect while disconnected, ignoring");
                } else {
                    self.teardown(true).await;
                }
                let _ = respond_to.send(());
            }

            SessionMessage::SetMediaEnabled {
                kind,
                enabled,
                respond_to,
            } => self.handle_set_media(kind, enabled, respond_to),

            SessionMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.state);
            }

            SessionMessage::GetRoster { respond_to } => {
                let _ = respond_to.send(self.roster.participants().to_vec());
            }

            SessionMessage::GetMediaState { respond_to } => {
                let _ = respond_to.send(self.media);
            }
        }
    }

    fn handle_connect(
        &mut self,
        grant: SessionGrant,
        platform_address: String,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    ) {
        if self.state != ConnectionState::Disconnected {
            let err = SessionError::InvalidState {
                operation: "connect",
                state: self.state,
            };
            self.activity
                .append(format!("Connection error: {err}"), Severity::Error);
            let _ = respond_to.send(Err(err));
            return;
        }

        if grant.is_expired_at(Utc::now()) {
            let reason = "grant expired".to_string();
            self.fail_connect(reason, respond_to);
            return;
        }

        self.epoch = self.epoch.wrapping_add(1);
        self.state = ConnectionState::Connecting;
        self.activity
            .append(format!("Connecting to {platform_address}..."), Severity::Info);

        info!(
            target: "sc.actor.session",
            session = %grant.session_name(),
            epoch = self.epoch,
            "Starting handshake"
        );

        let platform = Arc::clone(&self.platform);
        let outcome_tx = self.outcome_tx.clone();
        let token = grant.token().to_string();
        let epoch = self.epoch;
        self.handshake_task = Some(tokio::spawn(async move {
            let result = platform.connect(&platform_address, &token).await;
            let _ = outcome_tx
                .send(TaskOutcome::Handshake { epoch, result })
                .await;
        }));

        self.grant = Some(grant);
        self.pending_connect = Some(respond_to);
    }

    fn fail_connect(
        &mut self,
        reason: String,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    ) {
        warn!(target: "sc.actor.session", reason = %reason, "Connection failed");
        self.activity
            .append(format!("Connection error: {reason}"), Severity::Error);
        self.emit(SessionEvent::ConnectionFailed {
            reason: reason.clone(),
        });
        let _ = respond_to.send(Err(SessionError::ConnectionFailed(reason)));
    }

    fn handle_set_media(
        &mut self,
        kind: MediaKind,
        enabled: bool,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    ) {
        if self.state != ConnectionState::Connected {
            let err = SessionError::InvalidState {
                operation: toggle_operation(kind),
                state: self.state,
            };
            self.activity.append(
                format!("{} error: {err}", kind.device_label()),
                Severity::Error,
            );
            let _ = respond_to.send(Err(err));
            return;
        }

        if self.pending_toggles.contains_key(&kind) {
            let err = SessionError::OperationInProgress(kind);
            self.activity.append(err.to_string(), Severity::Warn);
            let _ = respond_to.send(Err(err));
            return;
        }

        let platform = Arc::clone(&self.platform);
        let outcome_tx = self.outcome_tx.clone();
        let epoch = self.epoch;
        let task = tokio::spawn(async move {
            let result = match kind {
                MediaKind::Video => platform.set_camera_enabled(enabled).await,
                MediaKind::Audio => platform.set_microphone_enabled(enabled).await,
            };
            let _ = outcome_tx
                .send(TaskOutcome::Toggle {
                    epoch,
                    kind,
                    enabled,
                    result,
                })
                .await;
        });

        self.pending_toggles
            .insert(kind, PendingToggle { respond_to, task });
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Handshake { epoch, result } => {
                if epoch != self.epoch || self.state != ConnectionState::Connecting {
                    debug!(target: "sc.actor.session", epoch, "Discarding stale handshake result");
                    return;
                }
                self.handshake_task = None;
                self.complete_handshake(result);
            }
            TaskOutcome::Toggle {
                epoch,
                kind,
                enabled,
                result,
            } => {
                if epoch != self.epoch {
                    debug!(target: "sc.actor.session", epoch, %kind, "Discarding stale toggle result");
                    return;
                }
                let Some(pending) = self.pending_toggles.remove(&kind) else {
                    return;
                };
                self.complete_toggle(kind, enabled, result, pending.respond_to);
            }
        }
    }

    fn complete_handshake(&mut self, result: Result<PlatformEvents, PlatformError>) {
        let Some(respond_to) = self.pending_connect.take() else {
            return;
        };

        match result {
            Ok(events) => {
                let (session_name, local_identity) = match &self.grant {
                    Some(grant) => (
                        grant.session_name().to_string(),
                        grant.subject_identity().to_string(),
                    ),
                    None => {
                        self.state = ConnectionState::Disconnected;
                        let _ = respond_to.send(Err(SessionError::Internal(
                            "connected without a grant".to_string(),
                        )));
                        return;
                    }
                };

                self.state = ConnectionState::Connected;
                self.platform_events = Some(events);
                self.roster.on_connected(&local_identity, self.media);

                info!(
                    target: "sc.actor.session",
                    session = %session_name,
                    identity = %local_identity,
                    "Connected"
                );
                self.activity.append(
                    format!("Connected to session: {session_name}"),
                    Severity::Success,
                );
                self.emit(SessionEvent::Connected {
                    session_name,
                    local_identity,
                });
                let _ = respond_to.send(Ok(()));
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                self.grant = None;
                self.fail_connect(e.to_string(), respond_to);
            }
        }
    }

    fn complete_toggle(
        &mut self,
        kind: MediaKind,
        enabled: bool,
        result: Result<Option<MediaTrack>, PlatformError>,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    ) {
        let label = kind.device_label();
        match result {
            Ok(track) => {
                self.media.set(kind, enabled);
                self.roster.set_local_media(kind, enabled, track);
                if enabled {
                    self.activity
                        .append(format!("{label} enabled"), Severity::Success);
                } else {
                    self.activity
                        .append(format!("{label} disabled"), Severity::Info);
                }
                self.emit(SessionEvent::LocalMediaChanged { kind, enabled });
                let _ = respond_to.send(Ok(()));
            }
            Err(e) => {
                warn!(target: "sc.actor.session", %kind, error = %e, "Media toggle failed");
                self.activity
                    .append(format!("{label} error: {e}"), Severity::Error);
                let _ = respond_to.send(Err(SessionError::ToggleFailed {
                    kind,
                    reason: e.to_string(),
                }));
            }
        }
    }

    async fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::PeerJoined { identity } => {
                if self.roster.on_peer_joined(&identity) {
                    self.activity
                        .append(format!("Participant joined: {identity}"), Severity::Info);
                    self.emit(SessionEvent::PeerJoined { identity });
                }
            }
            PlatformEvent::PeerLeft { identity } => {
                if self.roster.on_peer_left(&identity) {
                    self.activity
                        .append(format!("Participant left: {identity}"), Severity::Warn);
                    self.emit(SessionEvent::PeerLeft { identity });
                }
            }
            PlatformEvent::MediaAvailable {
                identity,
                kind,
                track,
            } => {
                if self.roster.on_media_available(&identity, kind, track) {
                    self.activity.append(
                        format!("Subscribed to {kind} from {identity}"),
                        Severity::Info,
                    );
                    self.emit(SessionEvent::MediaAvailable { identity, kind });
                }
            }
            PlatformEvent::MediaUnavailable { identity, kind } => {
                if self.roster.on_media_unavailable(&identity, kind) {
                    self.activity.append(
                        format!("Unsubscribed from {kind} of {identity}"),
                        Severity::Info,
                    );
                    self.emit(SessionEvent::MediaUnavailable { identity, kind });
                }
            }
            PlatformEvent::Disconnected { reason } => {
                info!(target: "sc.actor.session", reason = %reason, "Platform ended the session");
                self.teardown(false).await;
            }
        }
    }

    /// Return to Disconnected, resolving everything still in flight.
    async fn teardown(&mut self, notify_platform: bool) {
        if let Some(task) = self.handshake_task.take() {
            task.abort();
        }
        if notify_platform {
            self.platform.disconnect().await;
        }

        self.epoch = self.epoch.wrapping_add(1);
        self.state = ConnectionState::Disconnected;
        self.platform_events = None;
        self.grant = None;
        self.roster.on_disconnected();
        self.media = LocalMediaState::default();

        if let Some(respond_to) = self.pending_connect.take() {
            self.activity.append("Connection cancelled", Severity::Warn);
            let _ = respond_to.send(Err(SessionError::ConnectionCancelled));
        }

        for (kind, pending) in self.pending_toggles.drain() {
            pending.task.abort();
            let err = SessionError::InvalidState {
                operation: toggle_operation(kind),
                state: ConnectionState::Disconnected,
            };
            self.activity.append(
                format!("{} error: {err}", kind.device_label()),
                Severity::Error,
            );
            let _ = pending.respond_to.send(Err(err));
        }

        self.activity
            .append("Disconnected from session", Severity::Warn);
        self.emit(SessionEvent::Disconnected);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn toggle_operation(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => "toggle camera",
        MediaKind::Audio => "toggle microphone",
    }
}

async fn next_platform_event(events: &mut Option<PlatformEvents>) -> Option<PlatformEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
