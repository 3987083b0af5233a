//! Actor implementation for the session client.
//!
//! ```text
//! SessionConnectionActor (one per client session)
//! ├── owns connection state, roster and local media toggles
//! ├── spawns the platform handshake task
//! └── spawns one task per in-flight camera/microphone toggle
//! ```
//!
//! # Modules
//!
//! - [`session`] - `SessionConnectionActor` and its handle
//! - [`messages`] - Message, state and event types

pub mod messages;
pub mod session;

pub use messages::*;
pub use session::{SessionConnectionActor, SessionConnectionHandle};
