//! Metrics and observability utilities
//!
//! Provides Prometheus-style metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all RefDisp metrics
pub const METRICS_PREFIX: &str = "refdisp";

/// Buckets for single OpenAlex lookups (in seconds)
pub const RESOLVER_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s - request timeout
];

/// Buckets for a whole dispersion computation (one lookup per reference)
pub const DISPERSION_BUCKETS: &[f64] = &[
    0.5,
    1.0,
    2.5,
    5.0,
    10.0,
    30.0,
    60.0,
    120.0,
    300.0,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // HTTP metrics
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

    // Resolver metrics
    describe_counter!(
        format!("{}_resolver_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total work lookups against the bibliographic service"
    );

    describe_histogram!(
        format!("{}_resolver_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Work lookup latency in seconds"
    );

    // Dispersion metrics
    describe_counter!(
        format!("{}_dispersion_computed_total", METRICS_PREFIX),
        Unit::Count,
        "Total dispersion computations by outcome"
    );

    describe_histogram!(
        format!("{}_dispersion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Dispersion computation latency in seconds"
    );

    describe_histogram!(
        format!("{}_dispersion_reference_count", METRICS_PREFIX),
        Unit::Count,
        "Number of references of each focal work"
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

/// Helper to record one work lookup
pub fn record_resolution(duration_secs: f64, path: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_resolver_requests_total", METRICS_PREFIX),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_resolver_duration_seconds", METRICS_PREFIX),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// Helper to record one dispersion computation
pub fn record_dispersion(duration_secs: f64, outcome: &str, reference_count: Option<usize>) {
    counter!(
        format!("{}_dispersion_computed_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_dispersion_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);

    if let Some(count) = reference_count {
        histogram!(format!("{}_dispersion_reference_count", METRICS_PREFIX)).record(count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [RESOLVER_BUCKETS, DISPERSION_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
        // Request timeout must fall on a bucket edge
        assert!(RESOLVER_BUCKETS.contains(&30.0));
    }

    #[test]
    fn test_recorders_without_exporter() {
        let metrics = RequestMetrics::start("POST", "/v1/dispersion");
        metrics.finish(200);
        record_resolution(0.12, "doi", true);
        record_dispersion(1.5, "computed", Some(12));
        record_dispersion(0.3, "unavailable", None);
    }
}
