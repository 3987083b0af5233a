//! Session Token Service Library
//!
//! Issues signed, time-bounded access tokens that let a participant join a
//! named real-time session.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Token signing and identifier randomness
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `observability` - Metrics
//! - `routes` - Router and shared state
//! - `services` - Grant issuance

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod observability;
pub mod routes;
pub mod services;
