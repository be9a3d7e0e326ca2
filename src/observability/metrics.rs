//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define composer metrics (requests, latency, snippet outcomes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `composer_requests_total` (counter): compose requests by mode, status
//! - `composer_request_duration_seconds` (histogram): latency distribution
//! - `composer_snippets_total` (counter): snippet evaluations by origin, result
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for mode, HTTP status and snippet origin; unrecognised modes
//!   share one `other` label so clients cannot grow the series set

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::compose::{GroupOrigin, MergeMode};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one compose request.
pub fn record_request(mode: &MergeMode, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "composer_requests_total",
        "mode" => mode.label(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "composer_request_duration_seconds",
        "mode" => mode.label(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one snippet evaluation.
pub fn record_snippet(origin: GroupOrigin, resolved: bool) {
    let result = if resolved { "resolved" } else { "failed" };
    metrics::counter!(
        "composer_snippets_total",
        "origin" => origin.to_string(),
        "result" => result
    )
    .increment(1);
}
