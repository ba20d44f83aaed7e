//! Lightweight metrics helpers for Roundhouse.
//!
//! This module exposes a small set of convenience functions wrapping the
//! `metrics` crate macros. It does not embed a concrete exporter (the
//! application can install any compatible recorder externally) while still
//! describing Roundhouse‑specific metric names.
//!
//! Provided metrics (labels vary by family):
//! * `roundhouse_requests_total` (counter, by status)
//! * `roundhouse_request_duration_seconds` (histogram)
//! * `roundhouse_forward_attempts_total` (counter, by backend and outcome)
//! * `roundhouse_backend_request_duration_seconds` (histogram per backend)
//! * `roundhouse_backend_health_status` (gauge per backend)
//! * `roundhouse_healthy_backends` (gauge)
use std::time::Duration;

use metrics::{
    Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use once_cell::sync::Lazy;

pub const ROUNDHOUSE_REQUESTS_TOTAL: &str = "roundhouse_requests_total";
pub const ROUNDHOUSE_REQUEST_DURATION_SECONDS: &str = "roundhouse_request_duration_seconds";
pub const ROUNDHOUSE_FORWARD_ATTEMPTS_TOTAL: &str = "roundhouse_forward_attempts_total";
pub const ROUNDHOUSE_BACKEND_REQUEST_DURATION_SECONDS: &str =
    "roundhouse_backend_request_duration_seconds";
pub const ROUNDHOUSE_BACKEND_HEALTH_STATUS: &str = "roundhouse_backend_health_status";
pub const ROUNDHOUSE_HEALTHY_BACKENDS: &str = "roundhouse_healthy_backends";

/// Outcome label for a single forwarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Forwarded,
    TransportError,
    Timeout,
}

impl AttemptOutcome {
    fn as_label(self) -> &'static str {
        match self {
            AttemptOutcome::Forwarded => "forwarded",
            AttemptOutcome::TransportError => "transport_error",
            AttemptOutcome::Timeout => "timeout",
        }
    }
}

/// Record the health status gauge for a backend.
pub fn set_backend_health_status(backend_id: &str, is_healthy: bool) {
    let health_value = if is_healthy { 1.0 } else { 0.0 };
    gauge!(ROUNDHOUSE_BACKEND_HEALTH_STATUS, "backend" => backend_id.to_string()).set(health_value);
}

/// Publish the healthy count after a health check cycle.
pub fn set_healthy_backends(count: usize) {
    gauge!(ROUNDHOUSE_HEALTHY_BACKENDS).set(count as f64);
}

/// Count and time an inbound request once its final status is known.
pub fn record_request(status: u16, duration: Duration) {
    counter!(ROUNDHOUSE_REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
    histogram!(ROUNDHOUSE_REQUEST_DURATION_SECONDS).record(duration.as_secs_f64());
}

/// Count and time one forwarding attempt.
pub fn record_forward_attempt(backend_id: &str, outcome: AttemptOutcome, duration: Duration) {
    counter!(
        ROUNDHOUSE_FORWARD_ATTEMPTS_TOTAL,
        "backend" => backend_id.to_string(),
        "outcome" => outcome.as_label()
    )
    .increment(1);
    histogram!(
        ROUNDHOUSE_BACKEND_REQUEST_DURATION_SECONDS,
        "backend" => backend_id.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Describes every metric family once, against whichever recorder is installed
static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        ROUNDHOUSE_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of inbound requests answered by the balancer."
    );
    describe_histogram!(
        ROUNDHOUSE_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "End-to-end latency of inbound requests, including retries."
    );
    describe_counter!(
        ROUNDHOUSE_FORWARD_ATTEMPTS_TOTAL,
        Unit::Count,
        "Forwarding attempts against backends, by outcome."
    );
    describe_histogram!(
        ROUNDHOUSE_BACKEND_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of individual forwarding attempts."
    );
    describe_gauge!(
        ROUNDHOUSE_BACKEND_HEALTH_STATUS,
        "Health status of individual backends (1 for healthy, 0 for unhealthy)"
    );
    describe_gauge!(
        ROUNDHOUSE_HEALTHY_BACKENDS,
        "Number of backends healthy after the latest health check cycle."
    );
});

/// Initialize metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    tracing::info!("Initializing Roundhouse metrics system");

    Lazy::force(&DESCRIPTIONS);

    tracing::info!("Roundhouse metrics system initialized successfully");
    Ok(())
}
