//! Common types shared by the token service and the session client.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for access token claims, decoding and verification
pub mod jwt;

/// Module for the immutable session grant model
pub mod grant;
