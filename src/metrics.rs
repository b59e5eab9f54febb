/// Metrics and telemetry for Quillboard
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Moderation transitions and reports
/// - Account registrations
/// - Audit log write failures

use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Moderation Metrics ==========

    /// Moderation transitions by action and target kind
    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_actions_total",
        "Total number of moderation actions",
        &["action_type", "target_type"]
    )
    .unwrap();

    /// Reports created by target kind
    pub static ref REPORTS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reports_created_total",
        "Total number of reports created",
        &["report_type"]
    )
    .unwrap();

    /// Reports dismissed by target kind
    pub static ref REPORTS_DISMISSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reports_dismissed_total",
        "Total number of reports dismissed",
        &["report_type"]
    )
    .unwrap();

    // ========== Account Metrics ==========

    /// Account registrations
    pub static ref ACCOUNT_CREATIONS_TOTAL: IntCounter = register_int_counter!(
        "account_creations_total",
        "Total number of accounts created"
    )
    .unwrap();

    // ========== Audit Metrics ==========

    /// Activity log writes that failed and were dropped
    pub static ref AUDIT_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "audit_failures_total",
        "Total number of activity log writes that failed"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a moderation transition
pub fn record_moderation_action(action_type: &str, target_type: &str) {
    MODERATION_ACTIONS_TOTAL
        .with_label_values(&[action_type, target_type])
        .inc();
}

/// Record a report
pub fn record_report_created(report_type: &str) {
    REPORTS_CREATED_TOTAL
        .with_label_values(&[report_type])
        .inc();
}

/// Record dismissed reports
pub fn record_reports_dismissed(report_type: &str, count: u64) {
    REPORTS_DISMISSED_TOTAL
        .with_label_values(&[report_type])
        .inc_by(count);
}

/// HTTP metrics middleware.
///
/// Labels by matched route template so ids do not explode cardinality.
pub async fn track_http_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    HTTP_REQUESTS_ACTIVE.inc();
    let start = Instant::now();

    let response = next.run(req).await;

    HTTP_REQUESTS_ACTIVE.dec();
    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_counters_render() {
        record_moderation_action("ban", "account");
        record_report_created("article");
        record_reports_dismissed("article", 3);

        let output = render_metrics();
        assert!(output.contains("moderation_actions_total"));
        assert!(output.contains("reports_dismissed_total"));
    }
}
