//! # Token Service Test Utilities
//!
//! Shared test utilities for the token service and its clients.
//!
//! This crate provides:
//! - Fixed credentials and configuration (`crypto_fixtures`)
//! - Signed test tokens with arbitrary claims (`TestTokenBuilder`)
//! - Server test harness (`TestTokenServer` for E2E tests)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use token_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let server = TestTokenServer::spawn().await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_participant("alice")
//!         .in_session("demo")
//!         .sign();
//!
//!     token
//!         .assert_valid_jwt()
//!         .assert_for_subject("alice")
//!         .assert_signed_with(TEST_API_SECRET);
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
