//! Metrics and observability utilities
//!
//! Prometheus-style metrics with standardized naming. Nothing here is
//! exported unless a binary installs a recorder; the gateway installs the
//! Prometheus exporter, the command-line tools do not.

use crate::config::ObservabilityConfig;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Metrics prefix for all lineage metrics
pub const METRICS_PREFIX: &str = "lineage";

/// Buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
];

/// Buckets for text-generation latency (local models are slow)
pub const GENERATION_BUCKETS: &[f64] = &[
    0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let _ = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Filter metrics
    describe_counter!(
        format!("{}_filter_passes_total", METRICS_PREFIX),
        Unit::Count,
        "Total edge filter passes"
    );

    describe_counter!(
        format!("{}_edges_accepted_total", METRICS_PREFIX),
        Unit::Count,
        "Candidate edges accepted by the filter"
    );

    describe_counter!(
        format!("{}_edges_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Candidate edges rejected by the filter, by reason"
    );

    describe_gauge!(
        format!("{}_missing_ids", METRICS_PREFIX),
        Unit::Count,
        "Distinct unknown or undated ids in the last filter pass"
    );

    // Research metrics
    describe_counter!(
        format!("{}_papers_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Papers run through the research producer, by status"
    );

    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total text-generation requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Text-generation latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Rejection counts of one filter pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    pub unknown_reference: usize,
    pub undated_reference: usize,
    pub temporal_violation: usize,
    pub duplicate: usize,
}

/// Helper to record a filter pass
pub fn record_filter_pass(accepted: usize, rejected: RejectionCounts, missing_ids: usize) {
    counter!(format!("{}_filter_passes_total", METRICS_PREFIX)).increment(1);

    counter!(format!("{}_edges_accepted_total", METRICS_PREFIX)).increment(accepted as u64);

    for (reason, count) in [
        ("unknown_reference", rejected.unknown_reference),
        ("undated_reference", rejected.undated_reference),
        ("temporal_violation", rejected.temporal_violation),
        ("duplicate", rejected.duplicate),
    ] {
        counter!(
            format!("{}_edges_rejected_total", METRICS_PREFIX),
            "reason" => reason
        )
        .increment(count as u64);
    }

    gauge!(format!("{}_missing_ids", METRICS_PREFIX)).set(missing_ids as f64);
}

/// Helper to record a paper run through the producer
pub fn record_paper(success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_papers_processed_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);
}

/// Helper to record text-generation metrics
pub fn record_generation(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_generation_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, GENERATION_BUCKETS] {
            assert!(buckets.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        let metrics = RequestMetrics::start("GET", "/api/graph");
        metrics.finish(200);
        record_filter_pass(3, RejectionCounts { duplicate: 1, ..Default::default() }, 0);
        record_paper(false);
        // No recorder installed: calls are no-ops
    }
}
