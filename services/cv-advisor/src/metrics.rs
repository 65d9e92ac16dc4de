//! Prometheus metrics exposition
//!
//! Service-level metrics recorded here:
//!
//! - `advisor_requests_total` (counter): labels `kind`, `status`
//! - `advisor_request_duration_seconds` (histogram): label `kind`
//!
//! The dispatcher records `dispatch_attempts_total{outcome}` and
//! `dispatch_failures_total{classification}` through the same recorder.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket bounds for request latency. Analysis calls are slow (seconds) and
/// may include several backoff pauses, so the upper range is generous.
const DURATION_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0,
];

fn builder() -> anyhow::Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("advisor_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .context("failed to set histogram buckets")
}

/// Install the Prometheus recorder globally and return a handle for rendering.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Record a finished API request.
pub fn record_request(kind: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("advisor_requests_total", "kind" => kind, "status" => status.to_string())
        .increment(1);
    metrics::histogram!("advisor_request_duration_seconds", "kind" => kind).record(duration_secs);
}

/// In-process counters reported by `/health`.
#[derive(Clone, Debug)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
