//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mock_requests_total` (counter): served mock requests by method, status, scenario
//! - `mock_request_duration_seconds` (histogram): end-to-end handling time
//! - `mock_rate_limited_total` (counter): requests rejected by the limiter
//! - `mock_injected_faults_total` (counter): scenario error-rate hits
//! - `mock_imports_total` (counter): document imports by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, scenario: &str, start: Instant) {
    metrics::counter!(
        "mock_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "scenario" => scenario.to_string()
    )
    .increment(1);
    metrics::histogram!("mock_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("mock_rate_limited_total").increment(1);
}

pub fn record_injected_fault(scenario: &str) {
    metrics::counter!("mock_injected_faults_total", "scenario" => scenario.to_string()).increment(1);
}

pub fn record_import(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    metrics::counter!("mock_imports_total", "outcome" => outcome).increment(1);
}
