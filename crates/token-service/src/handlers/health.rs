//! Liveness check.

/// Returns "OK" while the process is serving. The issuer has no dependencies
/// to check.
pub async fn health_check() -> &'static str {
    "OK"
}
