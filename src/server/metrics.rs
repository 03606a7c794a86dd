use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all catalog manager metrics
const PREFIX: &str = "catalog_manager";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Database Metrics
    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_db_query_duration_seconds"),
            "Database query duration in seconds"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation"]
    ).expect("Failed to create db_query_duration_seconds metric");

    pub static ref DB_CONNECTION_ERRORS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_db_connection_errors_total"),
        "Total database connection errors"
    ).expect("Failed to create db_connection_errors_total metric");

    // Catalog Metrics
    pub static ref CATALOG_ENTRIES_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_entries_total"), "Total entries in the active catalog"),
        &["kind"]
    ).expect("Failed to create catalog_entries_total metric");

    // Provider Metrics
    pub static ref PROVIDER_VALIDATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_provider_validations_total"),
            "Data provider validations by provider and outcome"
        ),
        &["provider", "outcome"]
    ).expect("Failed to create provider_validations_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(DB_QUERY_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(DB_CONNECTION_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ENTRIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROVIDER_VALIDATIONS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn set_catalog_counts(num_types: usize, num_brands: usize, num_items: usize) {
    CATALOG_ENTRIES_TOTAL
        .with_label_values(&["type"])
        .set(num_types as f64);

    CATALOG_ENTRIES_TOTAL
        .with_label_values(&["brand"])
        .set(num_brands as f64);

    CATALOG_ENTRIES_TOTAL
        .with_label_values(&["item"])
        .set(num_items as f64);

    tracing::info!(
        "Catalog metrics updated: {} types, {} brands, {} items",
        num_types,
        num_brands,
        num_items
    );
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a database query
pub fn record_db_query(operation: &str, duration: Duration) {
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a database connection error
pub fn record_db_connection_error() {
    DB_CONNECTION_ERRORS_TOTAL.inc();
}

/// Record the outcome ("ok" or "error") of a provider validation
pub fn record_provider_validation(provider: &str, outcome: &str) {
    PROVIDER_VALIDATIONS_TOTAL
        .with_label_values(&[provider, outcome])
        .inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
