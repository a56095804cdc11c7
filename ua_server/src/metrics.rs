//! Prometheus metrics for monitoring account-service health.
//!
//! Metrics are exposed in Prometheus text format by an optional exporter
//! (see `METRICS_BIND`).

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Record HTTP request with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Increment OTP request counter.
pub fn otp_requests_total() {
    metrics::counter!("otp_requests_total").increment(1);
}

/// Increment OTP verification counter.
pub fn otp_verifications_total(success: bool) {
    metrics::counter!("otp_verifications_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment refresh-token rotation counter.
pub fn token_rotations_total() {
    metrics::counter!("token_rotations_total").increment(1);
}
