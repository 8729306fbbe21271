//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_phase_duration_seconds` (histogram): publish time by phase, outcome
//! - `lifecycle_handler_failures_total` (counter): failed handlers by phase
//! - `config_reloads_total` (counter): reload attempts by outcome
//! - `server_drain_total` (counter): drains by outcome
//! - `server_active_connections` (gauge): current connection count
//! - `http_requests_total` / `http_request_duration_seconds`: by method, status
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

pub fn record_phase(phase: &'static str, elapsed: Duration, ok: bool) {
    histogram!(
        "lifecycle_phase_duration_seconds",
        "phase" => phase,
        "outcome" => outcome(ok)
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_handler_failure(phase: &'static str) {
    counter!("lifecycle_handler_failures_total", "phase" => phase).increment(1);
}

pub fn record_config_reload(ok: bool) {
    counter!("config_reloads_total", "outcome" => outcome(ok)).increment(1);
}

pub fn record_drain(timed_out: bool, elapsed: Duration) {
    let label = if timed_out { "timeout" } else { "clean" };
    counter!("server_drain_total", "outcome" => label).increment(1);
    histogram!("server_drain_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn set_active_connections(count: u64) {
    gauge!("server_active_connections").set(count as f64);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

/// Middleware recording request count and latency.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    record_request(method.as_str(), response.status().as_u16(), start);
    response
}
