//! Message types for the session actor.
//!
//! Commands arrive over `tokio::sync::mpsc`; replies go back on a
//! `tokio::sync::oneshot` carried in the command.

use crate::errors::SessionError;
use crate::platform::MediaKind;
use crate::roster::Participant;
use common::grant::SessionGrant;
use std::fmt;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Local camera and microphone state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalMediaState {
    pub camera_enabled: bool,
    pub microphone_enabled: bool,
}

impl LocalMediaState {
    #[must_use]
    pub fn is_enabled(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Video => self.camera_enabled,
            MediaKind::Audio => self.microphone_enabled,
        }
    }

    pub fn set(&mut self, kind: MediaKind, enabled: bool) {
        match kind {
            MediaKind::Video => self.camera_enabled = enabled,
            MediaKind::Audio => self.microphone_enabled = enabled,
        }
    }
}

/// Notifications broadcast to session observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected {
        session_name: String,
        local_identity: String,
    },
    ConnectionFailed {
        reason: String,
    },
    Disconnected,
    PeerJoined {
        identity: String,
    },
    PeerLeft {
        identity: String,
    },
    MediaAvailable {
        identity: String,
        kind: MediaKind,
    },
    MediaUnavailable {
        identity: String,
        kind: MediaKind,
    },
    LocalMediaChanged {
        kind: MediaKind,
        enabled: bool,
    },
}

/// Messages sent to `SessionConnectionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Join the session named in the grant.
    Connect {
        grant: SessionGrant,
        platform_address: String,
        /// Resolved when the handshake finishes, fails or is cancelled.
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Leave the session, cancelling a pending handshake.
    Disconnect {
        respond_to: oneshot::Sender<()>,
    },

    /// Turn the local camera or microphone on or off.
    SetMediaEnabled {
        kind: MediaKind,
        enabled: bool,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    GetState {
        respond_to: oneshot::Sender<ConnectionState>,
    },

    GetRoster {
        respond_to: oneshot::Sender<Vec<Participant>>,
    },

    GetMediaState {
        respond_to: oneshot::Sender<LocalMediaState>,
    },
}
