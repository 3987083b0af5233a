//! Session Client Library
//!
//! Client side of a real-time session:
//!
//! - Requesting a join credential from the token service
//! - Connecting to the media platform and tracking connection state
//! - Tracking the participant roster and media availability
//! - Toggling the local camera and microphone
//! - Keeping a bounded activity log of everything that happened
//!
//! # Modules
//!
//! - [`actors`] - Session connection actor and its messages
//! - [`activity_log`] - Bounded activity log
//! - [`client`] - `SessionClient` facade
//! - [`config`] - Client configuration from environment
//! - [`errors`] - Error types
//! - [`platform`] - Real-time platform boundary and its in-process mock
//! - [`roster`] - Participant roster
//! - [`token_client`] - HTTP client for the token service

pub mod activity_log;
pub mod actors;
pub mod client;
pub mod config;
pub mod errors;
pub mod platform;
pub mod roster;
pub mod token_client;

pub use client::SessionClient;
