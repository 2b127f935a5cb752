//! Prometheus metrics for notes-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP requests by method, matched route and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "notes_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register http_requests_total")
});

pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "notes_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register http_request_duration")
});

/// Generation calls by outcome (`success`, `unauthorized`, `rate_limited`, ...).
pub static GENERATION_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "notes_generation_requests_total",
        "Total number of AI note generation requests",
        &["note_type", "outcome"]
    )
    .expect("Failed to register generation_requests_total")
});

/// Tokens reported by the provider.
pub static GENERATION_TOKENS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "notes_generation_tokens_total",
        "Total number of provider tokens consumed",
        &["kind"] // prompt, completion
    )
    .expect("Failed to register generation_tokens_total")
});

/// Provider round-trip duration.
pub static GENERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "notes_generation_duration_seconds",
        "AI provider request duration in seconds",
        &["note_type"],
        vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 60.0]
    )
    .expect("Failed to register generation_duration")
});

/// Webhook deliveries by event type and result.
pub static WEBHOOK_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "notes_webhook_events_total",
        "Total number of auth webhook events processed",
        &["event_type", "status"]
    )
    .expect("Failed to register webhook_events_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "notes_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&GENERATION_REQUESTS_TOTAL);
    Lazy::force(&GENERATION_TOKENS_TOTAL);
    Lazy::force(&GENERATION_DURATION);
    Lazy::force(&WEBHOOK_EVENTS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
