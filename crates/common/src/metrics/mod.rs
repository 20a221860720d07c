//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Yamdb metrics
pub const METRICS_PREFIX: &str = "yamdb";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

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

    // Registration metrics
    describe_counter!(
        format!("{}_signups_total", METRICS_PREFIX),
        Unit::Count,
        "Confirmation codes issued at signup"
    );

    describe_counter!(
        format!("{}_tokens_issued_total", METRICS_PREFIX),
        Unit::Count,
        "Bearer tokens issued for a confirmation code"
    );

    // Content metrics
    describe_counter!(
        format!("{}_reviews_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total reviews created"
    );

    describe_counter!(
        format!("{}_comments_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total comments created"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    route: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, route: &str) -> Self {
        Self {
            start: Instant::now(),
            route: route.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "route" => self.route.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "route" => self.route
        )
        .record(duration);
    }
}

/// A signup issued a confirmation code; `new_user` is false on re-registration
pub fn record_signup(new_user: bool) {
    counter!(
        format!("{}_signups_total", METRICS_PREFIX),
        "kind" => if new_user { "new" } else { "repeat" }
    )
    .increment(1);
}

pub fn record_token_issued() {
    counter!(format!("{}_tokens_issued_total", METRICS_PREFIX)).increment(1);
}

pub fn record_review_created(score: i32) {
    counter!(
        format!("{}_reviews_created_total", METRICS_PREFIX),
        "score" => score.to_string()
    )
    .increment(1);
}

pub fn record_comment_created() {
    counter!(format!("{}_comments_created_total", METRICS_PREFIX)).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        // Verify buckets are sorted and contain SLO targets
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        assert!(LATENCY_BUCKETS.contains(&0.050));
        assert!(LATENCY_BUCKETS.contains(&0.250));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every call is a no-op
        let metrics = RequestMetrics::start("GET", "/v1/titles/");
        metrics.finish(200);
        record_signup(true);
        record_token_issued();
        record_review_created(8);
        record_comment_created();
    }
}
