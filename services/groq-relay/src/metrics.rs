//! Prometheus metrics exposition
//!
//! - `relay_requests_total` (counter): labels `route`, `status`
//! - `relay_request_duration_seconds` (histogram): label `route`
//!
//! The key-pool crate records `relay_upstream_attempts_total{outcome}` and
//! `relay_pool_exhausted_total{reason}` into the same recorder.

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries from 5ms up to the worst case of several 60s attempts.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("relay_request_duration_seconds".to_string()),
        DURATION_BUCKETS,
    )
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a completed request on one of the relay's routes.
pub fn record_request(route: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("relay_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "route" => route)
        .record(duration_secs);
}
