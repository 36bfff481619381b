/// Metrics and telemetry for the admissions queue service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Queue entry lifecycle (joins and status transitions)
/// - Notification fan-out
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, register_int_gauge_vec, Encoder, Gauge, HistogramVec, IntCounter,
    IntCounterVec, IntGauge, IntGaugeVec, TextEncoder,
};

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
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Queue Metrics ==========

    /// Queue entries created by kind
    pub static ref QUEUE_ENTRIES_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "queue_entries_created_total",
        "Total number of queue entries created",
        &["kind"]
    )
    .unwrap();

    /// Queue status transitions by source and target status
    pub static ref QUEUE_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "queue_transitions_total",
        "Total number of queue status transitions",
        &["from", "to"]
    )
    .unwrap();

    /// Entries currently waiting (pending or confirmed) by kind
    pub static ref QUEUE_WAITING_ENTRIES: IntGaugeVec = register_int_gauge_vec!(
        "queue_waiting_entries",
        "Number of queue entries currently waiting",
        &["kind"]
    )
    .unwrap();

    // ========== Notification Metrics ==========

    /// Notifications written to the inbox
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "notifications_created_total",
        "Total number of notifications created"
    )
    .unwrap();

    // ========== Account Metrics ==========

    /// Account creations by role
    pub static ref ACCOUNT_CREATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "account_creations_total",
        "Total number of accounts created",
        &["role"]
    )
    .unwrap();

    /// Active sessions
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sessions_active",
        "Number of active sessions"
    )
    .unwrap();

    /// Total accounts
    pub static ref ACCOUNTS_TOTAL: IntGauge = register_int_gauge!(
        "accounts_total",
        "Total number of accounts"
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap();

    // ========== Error Metrics ==========

    /// Errors by error type
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total number of errors",
        &["error_type", "module"]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
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

/// Record a queue entry creation
pub fn record_queue_entry_created(kind: &str) {
    QUEUE_ENTRIES_CREATED_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a queue status transition
pub fn record_queue_transition(from: &str, to: &str) {
    QUEUE_TRANSITIONS_TOTAL.with_label_values(&[from, to]).inc();
}

/// Update the waiting-entries gauge for a kind
pub fn set_queue_waiting(kind: &str, count: i64) {
    QUEUE_WAITING_ENTRIES.with_label_values(&[kind]).set(count);
}

/// Record a notification write
pub fn record_notification_created() {
    NOTIFICATIONS_CREATED_TOTAL.inc();
}

/// Record an account creation
pub fn record_account_creation(role: &str) {
    ACCOUNT_CREATIONS_TOTAL.with_label_values(&[role]).inc();
}

/// Update account and session gauges
pub fn set_account_gauges(accounts: i64, sessions: i64) {
    ACCOUNTS_TOTAL.set(accounts);
    SESSIONS_ACTIVE.set(sessions);
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record an error
pub fn record_error(error_type: &str, module: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, module])
        .inc();
}

/// Update the uptime gauge
pub fn set_uptime(seconds: f64) {
    UPTIME_SECONDS.set(seconds);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/queue", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_queue_lifecycle() {
        record_queue_entry_created("consultation");
        record_queue_transition("pending", "confirmed");
        set_queue_waiting("consultation", 3);
        let metrics = render_metrics();
        assert!(metrics.contains("queue_entries_created_total"));
        assert!(metrics.contains("queue_transitions_total"));
        assert!(metrics.contains("queue_waiting_entries"));
    }

    #[test]
    fn test_record_background_job() {
        record_background_job("session_cleanup", "success", 1.5);
        let metrics = render_metrics();
        assert!(metrics.contains("background_jobs_total"));
        assert!(metrics.contains("background_job_duration_seconds"));
    }

    #[test]
    fn test_metrics_rendering() {
        record_http_request("GET", "/health", 200, 0.01);
        record_notification_created();
        record_account_creation("applicant");

        let metrics = render_metrics();

        assert!(metrics.contains("# HELP") || !metrics.is_empty());
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("notifications_created_total"));
        assert!(metrics.contains("account_creations_total"));
    }
}
