//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Certificate requests (results, duration, issuance)
//! - Domain validation outcomes
//! - Renewal passes and skips

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Certificate Requests
// =============================================================================

/// Certificate requests total by result.
pub static CERTIFICATE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "certward_certificate_requests_total",
            "Total certificate requests",
        ),
        // "success", "validation", "prerequisite_configuration", "issuance",
        // "installation", "unexpected"
        &["result"],
    )
    .unwrap()
});

/// Certificate request duration in seconds.
pub static CERTIFICATE_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "certward_certificate_request_duration_seconds",
            "Duration of a certificate request",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"],
    )
    .unwrap()
});

/// Certificates issued by the provider.
pub static CERTIFICATES_ISSUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "certward_certificates_issued_total",
        "Certificates issued by the provider",
    )
    .unwrap()
});

// =============================================================================
// Domain Validation
// =============================================================================

/// Domain validations by final state.
pub static DOMAIN_VALIDATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "certward_domain_validations_total",
            "Domain validation outcomes",
        ),
        &["outcome"], // "validated", "reused_valid", or a failure reason
    )
    .unwrap()
});

// =============================================================================
// Renewal
// =============================================================================

/// Completed renewal passes.
pub static RENEWAL_PASSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("certward_renewal_passes_total", "Completed renewal passes").unwrap()
});

/// Items skipped by renewal passes, by reason.
pub static RENEWAL_SKIPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "certward_renewal_skips_total",
            "Items skipped during renewal passes",
        ),
        &["reason"], // "certificate_still_valid", "site_stopped"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Requests
        Box::new(CERTIFICATE_REQUESTS.clone()),
        Box::new(CERTIFICATE_REQUEST_DURATION.clone()),
        Box::new(CERTIFICATES_ISSUED.clone()),
        // Validation
        Box::new(DOMAIN_VALIDATIONS.clone()),
        // Renewal
        Box::new(RENEWAL_PASSES.clone()),
        Box::new(RENEWAL_SKIPS.clone()),
    ]
}
