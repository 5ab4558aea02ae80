//! Metrics collection and exposition.
//!
//! # Metrics
//! - `teller_api_requests_total` (counter): API responses by route, status
//! - `teller_rate_limited_total` (counter): throttled requests by route
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - The Prometheus exporter serves its own listener, separate from the API

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count an API response.
pub fn record_api_request(route: &'static str, status: u16) {
    metrics::counter!(
        "teller_api_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count a request rejected by the rate limiter.
pub fn record_rate_limited(route: &'static str) {
    metrics::counter!("teller_rate_limited_total", "route" => route).increment(1);
}
