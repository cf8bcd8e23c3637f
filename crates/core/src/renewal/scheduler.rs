//! One renewal pass over the managed item fleet.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::binding::BindingAdmin;
use crate::item::{ItemFilter, ItemStoreError, ManagedCertificateItem, ManagedItemStore};
use crate::metrics;
use crate::request::{CertificateRequestResult, CertificateRequester, ProgressSink, RequestProgressState};

use super::policy::{is_due, RenewalPolicy, SkipReason};

/// Errors that stop a renewal pass before it starts.
#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("Failed to load managed items: {0}")]
    Store(#[from] ItemStoreError),
}

/// An item a pass left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub item_id: String,
    pub item_name: String,
    pub reason: SkipReason,
    pub message: String,
}

/// Outcome of one renewal pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenewalPassReport {
    /// One entry per processed item, in processing order.
    pub results: Vec<CertificateRequestResult>,
    pub skipped: Vec<SkippedItem>,
}

impl RenewalPassReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Per-item progress sinks, keyed by item id.
#[derive(Default, Clone)]
pub struct ProgressSinks {
    sinks: HashMap<String, Arc<dyn ProgressSink>>,
}

impl ProgressSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item_id: impl Into<String>, sink: Arc<dyn ProgressSink>) -> Self {
        self.insert(item_id, sink);
        self
    }

    pub fn insert(&mut self, item_id: impl Into<String>, sink: Arc<dyn ProgressSink>) {
        self.sinks.insert(item_id.into(), sink);
    }

    pub fn get(&self, item_id: &str) -> Option<&dyn ProgressSink> {
        self.sinks.get(item_id).map(|sink| sink.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for ProgressSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSinks")
            .field("items", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Decides which items are due and drives a certificate request for each.
///
/// Items are processed strictly one after another in fleet order.
pub struct RenewalScheduler {
    requester: Arc<CertificateRequester>,
    binding: Arc<dyn BindingAdmin>,
    items: Arc<dyn ManagedItemStore>,
    audit: Option<AuditHandle>,
}

impl RenewalScheduler {
    pub fn new(
        requester: Arc<CertificateRequester>,
        binding: Arc<dyn BindingAdmin>,
        items: Arc<dyn ManagedItemStore>,
    ) -> Self {
        Self {
            requester,
            binding,
            items,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn requester(&self) -> &Arc<CertificateRequester> {
        &self.requester
    }

    async fn audit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }

    /// Load every managed item and run one pass over them.
    pub async fn renew_all(
        &self,
        policy: &RenewalPolicy,
        sinks: &ProgressSinks,
        triggered_by: &str,
    ) -> Result<RenewalPassReport, RenewalError> {
        let items = self.items.list(&ItemFilter::new())?;
        let started = Instant::now();

        info!(
            "Starting renewal pass over {} items (triggered by {})",
            items.len(),
            triggered_by
        );
        self.audit(AuditEvent::RenewalPassStarted {
            triggered_by: triggered_by.to_string(),
            candidates: items.len() as u32,
        })
        .await;

        let report = self.run_renewal_pass(&items, policy, sinks).await;

        info!(
            "Renewal pass finished: {} processed, {} succeeded, {} failed, {} skipped",
            report.results.len(),
            report.succeeded(),
            report.failed(),
            report.skipped.len()
        );
        self.audit(AuditEvent::RenewalPassCompleted {
            processed: report.results.len() as u32,
            succeeded: report.succeeded() as u32,
            failed: report.failed() as u32,
            skipped: report.skipped.len() as u32,
            duration_ms: started.elapsed().as_millis() as u64,
        })
        .await;

        Ok(report)
    }

    /// Run one pass over `items` with `policy`.
    ///
    /// Never fails: a failed item yields a failure result and the pass
    /// continues with the next one.
    pub async fn run_renewal_pass(
        &self,
        items: &[ManagedCertificateItem],
        policy: &RenewalPolicy,
        sinks: &ProgressSinks,
    ) -> RenewalPassReport {
        let mut report = RenewalPassReport::default();
        let now = Utc::now();

        for item in items.iter().filter(|item| policy.includes(item)) {
            let sink = sinks.get(&item.id);

            if !is_due(item, policy.renewal_interval_days, now) {
                self.skip(item, SkipReason::CertificateStillValid, sink, &mut report)
                    .await;
                continue;
            }

            if policy.skip_stopped_sites && !self.site_allows_renewal(item).await {
                self.skip(item, SkipReason::SiteStopped, sink, &mut report)
                    .await;
                continue;
            }

            debug!("Renewing {} ({})", item.name, item.id);
            let result = self.requester.request_certificate(item, sink).await;
            report.results.push(result);
        }

        metrics::RENEWAL_PASSES.inc();
        report
    }

    async fn site_allows_renewal(&self, item: &ManagedCertificateItem) -> bool {
        match self.binding.site_state(item).await {
            Ok(state) => state.allows_renewal(),
            Err(e) => {
                warn!(
                    "Could not determine site state for {}, assuming running: {}",
                    item.name, e
                );
                true
            }
        }
    }

    async fn skip(
        &self,
        item: &ManagedCertificateItem,
        reason: SkipReason,
        sink: Option<&dyn ProgressSink>,
        report: &mut RenewalPassReport,
    ) {
        let message = reason.message();
        info!("{}: {}", item.name, message);

        metrics::RENEWAL_SKIPS
            .with_label_values(&[reason.as_str()])
            .inc();
        if let Some(sink) = sink {
            sink.report(RequestProgressState::succeeded(message));
        }
        self.audit(AuditEvent::RenewalSkipped {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            reason: reason.as_str().to_string(),
        })
        .await;

        report.skipped.push(SkippedItem {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            reason,
            message: message.to_string(),
        });
    }
}
