//! Observability for the token service.
//!
//! # Privacy by Default
//!
//! Handlers and services use `#[instrument(skip_all)]` and log an explicit
//! allow-list of fields:
//! - **SAFE**: session name, whether defaults were applied, outcome, durations
//! - **NEVER**: API secret, signed tokens

pub mod metrics;

pub use metrics::{init_metrics_recorder, record_identifier_default, record_token_issuance};
