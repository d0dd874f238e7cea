//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by route, status
//! - `proxy_request_duration_seconds` (histogram): latency by route
//! - `proxy_rate_limited_total` (counter): rejected by the rate limiter
//! - `proxy_upstream_errors_total` (counter): upstream failures by kind
//! - `proxy_tracked_clients` (gauge): rate limit windows held in memory
//!
//! Without an installed recorder every call is a no-op, so tests and
//! deployments with metrics disabled pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        return;
    }

    describe_counter!("proxy_requests_total", "Total API requests by route and status");
    describe_histogram!("proxy_request_duration_seconds", "API request latency in seconds");
    describe_counter!("proxy_rate_limited_total", "Requests rejected by the rate limiter");
    describe_counter!("proxy_upstream_errors_total", "Upstream failures by kind");
    describe_gauge!("proxy_tracked_clients", "Rate limit windows currently held");

    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("proxy_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    histogram!("proxy_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("proxy_rate_limited_total").increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("proxy_tracked_clients").set(count as f64);
}
