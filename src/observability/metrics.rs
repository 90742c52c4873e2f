//! Metrics collection and exposition.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize metrics exporter and server.
pub fn init_metrics(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus recorder");

    tracing::info!("Metrics server listening on http://{}", addr);
}

/// Helper to record a proxy request.
pub fn record_request(method: &str, status: u16, backend: &str, duration: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];
    
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(duration.elapsed().as_secs_f64());
}

/// Helper to update a single backend's liveness gauge.
pub fn record_backend_health(backend: &str, alive: bool) {
    let val = if alive { 1.0 } else { 0.0 };
    gauge!("proxy_backend_alive", "backend" => backend.to_string()).set(val);
}

/// Helper to record the pool's live backend count after a reconfigure
/// or a liveness transition.
pub fn record_pool_size(alive: usize, total: usize) {
    gauge!("proxy_backends_alive").set(alive as f64);
    gauge!("proxy_backends_total").set(total as f64);
}

/// Helper to record a rate-limiter admission decision.
pub fn record_admission(allowed: bool) {
    let label = if allowed { "allowed" } else { "denied" };
    counter!("proxy_rate_limit_decisions_total", "decision" => label).increment(1);
}
