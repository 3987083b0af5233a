//! Metrics definitions for the token service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ts_` prefix for Token Service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)
//! - `error_category`: 4 values (none, invalid_argument, issuance_failed, internal)
//! - `field`: 2 values (room, participant)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded. Issuance is a local HMAC
/// over a few hundred bytes, so the buckets are sub-millisecond to tens of
/// milliseconds.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ts_token_issuance".to_string()),
            &[
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.010, 0.025, 0.050, 0.100,
            ],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record token issuance duration and outcome
///
/// Metric: `ts_token_issuance_duration_seconds`, `ts_token_issuance_total`
/// Labels: `status`, `error_category`
pub fn record_token_issuance(status: &str, error_category: Option<&str>, duration: Duration) {
    let category = error_category.unwrap_or("none");

    histogram!("ts_token_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("ts_token_issuance_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

/// Record an identifier filled in by the issuer
///
/// Metric: `ts_identifier_defaults_total`
/// Labels: `field`
pub fn record_identifier_default(field: &str) {
    counter!("ts_identifier_defaults_total", "field" => field.to_string()).increment(1);
}
