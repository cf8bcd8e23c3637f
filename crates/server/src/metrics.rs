//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the certward server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Managed item counts and renewal service state (collected dynamically)
//! - Engine metrics registered from `certward_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use certward_core::{ItemFilter, ManagedItemType};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "certward_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("certward_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "certward_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Managed Item Metrics (collected dynamically)
// =============================================================================

/// Managed items by type.
pub static MANAGED_ITEMS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("certward_managed_items", "Managed items by type"),
        &["type"],
    )
    .unwrap()
});

/// Managed items included in auto renewal.
pub static MANAGED_ITEMS_AUTO_RENEW: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "certward_managed_items_auto_renew",
        "Managed items included in auto renewal",
    )
    .unwrap()
});

// =============================================================================
// Renewal Service Metrics (collected dynamically)
// =============================================================================

/// Renewal service running state (1 = running, 0 = stopped).
pub static RENEWAL_SERVICE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "certward_renewal_service_running",
        "Whether the renewal service is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Whether a renewal pass is executing.
pub static RENEWAL_PASS_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "certward_renewal_pass_in_progress",
        "Whether a renewal pass is executing (1) or idle (0)",
    )
    .unwrap()
});

/// Whether a certificate request holds the provider session.
pub static PROVIDER_SESSION_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "certward_provider_session_busy",
        "Whether a certificate request holds the provider session (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Items
    registry.register(Box::new(MANAGED_ITEMS.clone())).unwrap();
    registry
        .register(Box::new(MANAGED_ITEMS_AUTO_RENEW.clone()))
        .unwrap();

    // Renewal
    registry
        .register(Box::new(RENEWAL_SERVICE_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(RENEWAL_PASS_IN_PROGRESS.clone()))
        .unwrap();
    registry
        .register(Box::new(PROVIDER_SESSION_BUSY.clone()))
        .unwrap();

    // Engine metrics (requests, validations, renewal passes)
    for metric in certward_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the item store and renewal service.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.renewal().status().await;
    RENEWAL_SERVICE_RUNNING.set(i64::from(status.running));
    RENEWAL_PASS_IN_PROGRESS.set(i64::from(status.pass_in_progress));
    PROVIDER_SESSION_BUSY.set(i64::from(state.requester().is_busy()));

    let items = state.items();
    for item_type in [ManagedItemType::WebServerBound, ManagedItemType::Manual] {
        let filter = ItemFilter::new().with_item_type(item_type);
        if let Ok(count) = items.count(&filter) {
            MANAGED_ITEMS
                .with_label_values(&[item_type.as_str()])
                .set(count);
        }
    }
    if let Ok(count) = items.count(&ItemFilter::new().auto_renew_only()) {
        MANAGED_ITEMS_AUTO_RENEW.set(count);
    }
}

/// Normalize a request path for metric labels.
///
/// Item ids are UUIDs; they are replaced with `{id}` to bound label cardinality.
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}
