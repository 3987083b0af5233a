//! Participant roster for one session.
//!
//! The roster holds exactly one local entry while connected, followed by the
//! remote peers in arrival order. Every event method returns whether the
//! roster changed so callers only log and emit real transitions.

use crate::actors::messages::LocalMediaState;
use crate::platform::{MediaKind, MediaTrack};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Participant {
    pub identity: String,
    pub is_local: bool,
    pub video_available: bool,
    pub audio_available: bool,
    pub video_track: Option<MediaTrack>,
    pub audio_track: Option<MediaTrack>,
}

impl Participant {
    fn new(identity: &str, is_local: bool) -> Self {
        Self {
            identity: identity.to_string(),
            is_local,
            video_available: false,
            audio_available: false,
            video_track: None,
            audio_track: None,
        }
    }

    fn set_media(&mut self, kind: MediaKind, available: bool, track: Option<MediaTrack>) {
        match kind {
            MediaKind::Video => {
                self.video_available = available;
                self.video_track = track;
            }
            MediaKind::Audio => {
                self.audio_available = available;
                self.audio_track = track;
            }
        }
    }

    #[must_use]
    pub fn has_media(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Video => self.video_available,
            MediaKind::Audio => self.audio_available,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RosterTracker {
    participants: Vec<Participant>,
}

impl RosterTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to a single local entry.
    pub fn on_connected(&mut self, local_identity: &str, media: LocalMediaState) {
        let mut local = Participant::new(local_identity, true);
        local.video_available = media.camera_enabled;
        local.audio_available = media.microphone_enabled;
        self.participants = vec![local];
    }

    /// Add a remote peer. Duplicates and the local identity are ignored.
    pub fn on_peer_joined(&mut self, identity: &str) -> bool {
        if self.get(identity).is_some() {
            debug!(target: "sc.roster", identity = %identity, "Ignoring duplicate join");
            return false;
        }
        self.participants.push(Participant::new(identity, false));
        true
    }

    /// Remove a remote peer. The local entry is never removed this way.
    pub fn on_peer_left(&mut self, identity: &str) -> bool {
        let before = self.participants.len();
        self.participants
            .retain(|p| p.is_local || p.identity != identity);
        self.participants.len() != before
    }

    pub fn on_media_available(
        &mut self,
        identity: &str,
        kind: MediaKind,
        track: Option<MediaTrack>,
    ) -> bool {
        match self.remote_mut(identity) {
            Some(peer) => {
                peer.set_media(kind, true, track);
                true
            }
            None => false,
        }
    }

    pub fn on_media_unavailable(&mut self, identity: &str, kind: MediaKind) -> bool {
        match self.remote_mut(identity) {
            Some(peer) if peer.has_media(kind) => {
                peer.set_media(kind, false, None);
                true
            }
            _ => false,
        }
    }

    pub fn on_disconnected(&mut self) {
        self.participants.clear();
    }

    /// Reflect a local camera or microphone change on the local entry.
    pub fn set_local_media(
        &mut self,
        kind: MediaKind,
        enabled: bool,
        track: Option<MediaTrack>,
    ) -> bool {
        match self.participants.iter_mut().find(|p| p.is_local) {
            Some(local) => {
                let track = if enabled { track } else { None };
                local.set_media(kind, enabled, track);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.identity == identity)
    }

    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.identity.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    fn remote_mut(&mut self, identity: &str) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| !p.is_local && p.identity == identity)
    }
}
