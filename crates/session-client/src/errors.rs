//! Session client error types.
//!
//! Every error returned from a session operation has already been written to
//! the activity log by the time the caller sees it.

use crate::actors::messages::ConnectionState;
use crate::platform::MediaKind;
use common::jwt::JwtError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Operation not allowed in the current connection state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    /// The platform rejected the grant or could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A disconnect was requested before the handshake finished.
    #[error("Connection cancelled")]
    ConnectionCancelled,

    /// The platform failed to change a local media device.
    #[error("{} toggle failed: {reason}", .kind.device_label())]
    ToggleFailed { kind: MediaKind, reason: String },

    /// A toggle of the same kind is still running.
    #[error("{} operation already in progress", .0.device_label())]
    OperationInProgress(MediaKind),

    /// The token service did not return a credential.
    #[error("Token request failed: {0}")]
    Issuance(String),

    /// The credential could not be read as a grant.
    #[error("Invalid grant: {0}")]
    InvalidGrant(#[from] JwtError),

    #[error("Internal error: {0}")]
    Internal(String),
}
