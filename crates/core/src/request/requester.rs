use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::authorization::{resolve_reuse, FailureReason};
use crate::binding::BindingAdmin;
use crate::cert_store::CertificateStore;
use crate::challenge::{ChallengeCoordinator, DomainValidation};
use crate::item::{ManagedCertificateItem, ManagedItemStore, ManagedItemType};
use crate::metrics;
use crate::provider::{AcmeProvider, IssuanceOutcome, PendingAuthorization};

use super::progress::{emit, ProgressSink, RequestProgressState};
use super::types::{
    CertificateRequestResult, DomainValidationReport, RequestError, RequestFailureKind,
};

/// Turns one managed item into one certificate request result.
///
/// Holds the provider session lock: at most one request runs against the
/// provider at a time, whichever caller started it.
pub struct CertificateRequester {
    provider: Arc<dyn AcmeProvider>,
    binding: Arc<dyn BindingAdmin>,
    cert_store: Arc<dyn CertificateStore>,
    items: Arc<dyn ManagedItemStore>,
    coordinator: ChallengeCoordinator,
    audit: Option<AuditHandle>,
    reuse_identifiers: bool,
    session: Mutex<()>,
}

impl CertificateRequester {
    pub fn new(
        provider: Arc<dyn AcmeProvider>,
        binding: Arc<dyn BindingAdmin>,
        cert_store: Arc<dyn CertificateStore>,
        items: Arc<dyn ManagedItemStore>,
    ) -> Self {
        let coordinator = ChallengeCoordinator::new(Arc::clone(&provider), Arc::clone(&binding));
        Self {
            provider,
            binding,
            cert_store,
            items,
            coordinator,
            audit: None,
            reuse_identifiers: false,
            session: Mutex::new(()),
        }
    }

    /// Reuse unexpired provider identifiers instead of revalidating.
    pub fn with_identifier_reuse(mut self, enabled: bool) -> Self {
        self.reuse_identifiers = enabled;
        self
    }

    /// Record request activity in the audit log.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether a request currently holds the provider session.
    pub fn is_busy(&self) -> bool {
        self.session.try_lock().is_err()
    }

    async fn audit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }

    /// Request (or renew) the certificate for `item`.
    ///
    /// Never fails: every error, and any collaborator panic, is converted
    /// into a failure result carrying the item name and the error text. Waits for the provider session if
    /// another request holds it.
    pub async fn request_certificate(
        &self,
        item: &ManagedCertificateItem,
        progress: Option<&dyn ProgressSink>,
    ) -> CertificateRequestResult {
        let _session = self.session.lock().await;
        let started = Instant::now();

        info!("Beginning certificate request for {} ({})", item.name, item.id);
        emit(
            progress,
            RequestProgressState::running("Registering domain identifiers"),
        );

        let mut reports = Vec::new();
        let outcome = AssertUnwindSafe(self.perform_request(item, progress, &mut reports))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Certificate request for {} failed: {}", item.name, e);
                CertificateRequestResult::failed(
                    item.clone(),
                    RequestFailureKind::Unexpected,
                    format!("{}: Request failed - {}", item.name, e),
                    reports,
                )
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!("Certificate request for {} panicked: {}", item.name, detail);
                CertificateRequestResult::failed(
                    item.clone(),
                    RequestFailureKind::Unexpected,
                    format!("{}: Request failed - {}", item.name, detail),
                    reports,
                )
            }
        };

        let elapsed = started.elapsed();
        let outcome = result.outcome_label();
        metrics::CERTIFICATE_REQUESTS
            .with_label_values(&[outcome])
            .inc();
        metrics::CERTIFICATE_REQUEST_DURATION
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());

        if result.success {
            info!("Certificate request for {} succeeded: {}", item.name, result.message);
        } else {
            warn!("Certificate request for {} failed: {}", item.name, result.message);
        }

        self.audit(AuditEvent::RequestCompleted {
            item_id: item.id.clone(),
            success: result.success,
            message: result.message.clone(),
            failure: result.failure.map(|kind| kind.as_str().to_string()),
            duration_ms: elapsed.as_millis() as u64,
        })
        .await;
        emit(progress, RequestProgressState::finished(&result));

        result
    }

    async fn perform_request(
        &self,
        item: &ManagedCertificateItem,
        progress: Option<&dyn ProgressSink>,
        reports: &mut Vec<DomainValidationReport>,
    ) -> Result<CertificateRequestResult, RequestError> {
        let config = &item.request_config;
        let domains = config.distinct_domains();

        self.audit(AuditEvent::RequestStarted {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            domains: domains.clone(),
        })
        .await;

        let mut authorizations: Vec<PendingAuthorization> = Vec::with_capacity(domains.len());
        let mut failures: Vec<DomainValidation> = Vec::new();

        for domain in &domains {
            let existing = if self.reuse_identifiers {
                self.provider.get_domain_identifier(domain).await?
            } else {
                None
            };
            let decision = resolve_reuse(domain, existing.as_ref(), self.reuse_identifiers, Utc::now());

            debug!("Validating {} ({})", domain, decision.as_str());
            self.audit(AuditEvent::DomainValidationStarted {
                item_id: item.id.clone(),
                domain: domain.clone(),
                decision: decision.as_str().to_string(),
            })
            .await;
            emit(
                progress,
                RequestProgressState::running(format!("Registering and validating {}", domain)),
            );

            let validation = self
                .coordinator
                .validate_domain(item, domain, decision, progress)
                .await?;

            let failure = validation.state.failure();
            metrics::DOMAIN_VALIDATIONS
                .with_label_values(&[failure.map_or(validation.state.as_str(), |f| f.as_str())])
                .inc();
            self.audit(AuditEvent::DomainValidationCompleted {
                item_id: item.id.clone(),
                domain: domain.clone(),
                state: validation.state.as_str().to_string(),
                validated: validation.is_validated(),
                reason: failure.map(|f| f.to_string()),
            })
            .await;
            reports.push(DomainValidationReport::from(&validation));

            if validation.is_validated() {
                emit(
                    progress,
                    RequestProgressState::running(format!("Domain validation completed: {}", domain)),
                );
                authorizations.push(validation.authorization);
            } else {
                let reason = failure.unwrap_or(FailureReason::ValidationRejected);
                emit(
                    progress,
                    RequestProgressState::running(format!("{}: {}", reason, domain)),
                );
                failures.push(validation);
            }
        }

        if authorizations.len() != domains.len() {
            return Ok(Self::validation_failure(item, &failures, std::mem::take(reports)));
        }

        let Some((first, rest)) = authorizations.split_first() else {
            return Ok(CertificateRequestResult::failed(
                item.clone(),
                RequestFailureKind::Validation,
                "No domains to validate",
                std::mem::take(reports),
            ));
        };
        let primary = first.domain().to_string();
        let alternatives: Vec<String> = rest
            .iter()
            .map(|a| a.domain().to_string())
            .filter(|d| *d != primary)
            .collect();

        emit(
            progress,
            RequestProgressState::running("Requesting certificate"),
        );
        let outcome = match self.provider.request_issuance(&primary, &alternatives).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_timeout() => IssuanceOutcome::failed(e.to_string()),
            Err(e) => return Err(e.into()),
        };

        let artifact_path = match outcome {
            IssuanceOutcome {
                success: true,
                artifact_path: Some(path),
                ..
            } => path,
            IssuanceOutcome { error_message, .. } => {
                let detail = error_message.unwrap_or_default();
                self.audit(AuditEvent::IssuanceFailed {
                    item_id: item.id.clone(),
                    primary_domain: primary.clone(),
                    error: detail.clone(),
                })
                .await;
                let message = format!(
                    "The certificate authority did not issue a valid certificate in the time allowed. {}",
                    detail
                );
                return Ok(CertificateRequestResult::failed(
                    item.clone(),
                    RequestFailureKind::Issuance,
                    message.trim_end(),
                    std::mem::take(reports),
                ));
            }
        };

        metrics::CERTIFICATES_ISSUED.inc();
        self.audit(AuditEvent::CertificateIssued {
            item_id: item.id.clone(),
            primary_domain: primary.clone(),
            alternative_domains: alternatives.clone(),
            artifact_path: artifact_path.display().to_string(),
        })
        .await;
        emit(
            progress,
            RequestProgressState::running("Completed certificate request"),
        );

        let automated = item.item_type == ManagedItemType::WebServerBound
            && config.perform_automated_cert_binding;

        if automated {
            emit(
                progress,
                RequestProgressState::running("Performing automated certificate binding"),
            );
            let install_error = match self
                .binding
                .install_certificate(config, &artifact_path, true)
                .await
            {
                Ok(true) => None,
                Ok(false) => Some("installer reported no change".to_string()),
                Err(e) => Some(e.to_string()),
            };

            if let Some(error) = install_error {
                warn!(
                    "Installing {} for {} failed: {}",
                    artifact_path.display(),
                    item.name,
                    error
                );
                self.audit(AuditEvent::InstallationFailed {
                    item_id: item.id.clone(),
                    artifact_path: artifact_path.display().to_string(),
                    error,
                })
                .await;
                return Ok(CertificateRequestResult::failed(
                    item.clone(),
                    RequestFailureKind::Installation,
                    format!(
                        "An error occurred installing the certificate. Certificate file may not be valid: {}",
                        artifact_path.display()
                    ),
                    std::mem::take(reports),
                ));
            }
        }

        let mut updated = item.clone();
        self.apply_certificate(&mut updated, &artifact_path).await;
        self.items.save(&updated)?;

        self.audit(AuditEvent::CertificateInstalled {
            item_id: item.id.clone(),
            artifact_path: artifact_path.display().to_string(),
            automated,
        })
        .await;

        let message = if automated {
            format!(
                "Certificate installed and SSL bindings updated for {}",
                config.primary_domain
            )
        } else {
            format!(
                "Certificate created ready for manual binding: {}",
                artifact_path.display()
            )
        };

        Ok(CertificateRequestResult::succeeded(
            updated,
            message,
            artifact_path,
            std::mem::take(reports),
        ))
    }

    /// Record a new certificate on the item. Unreadable dates leave the
    /// validity window untouched.
    async fn apply_certificate(&self, item: &mut ManagedCertificateItem, artifact_path: &Path) {
        match self.cert_store.read_certificate_dates(artifact_path).await {
            Ok(dates) => {
                item.date_start = Some(dates.not_before);
                item.date_expiry = Some(dates.not_after);
            }
            Err(e) => {
                warn!("Failed to parse certificate dates for {}: {}", item.name, e);
                self.audit(AuditEvent::CertificateDatesUnreadable {
                    item_id: item.id.clone(),
                    artifact_path: artifact_path.display().to_string(),
                    error: e.to_string(),
                })
                .await;
            }
        }

        let now = Utc::now();
        item.date_issued = Some(now);
        item.date_renewed = Some(now);
        item.certificate_path = Some(artifact_path.to_path_buf());
    }

    fn validation_failure(
        item: &ManagedCertificateItem,
        failures: &[DomainValidation],
        reports: Vec<DomainValidationReport>,
    ) -> CertificateRequestResult {
        let prerequisite = failures
            .iter()
            .find(|v| v.state.failure() == Some(FailureReason::PrerequisiteConfiguration));

        if let Some(failed) = prerequisite {
            return CertificateRequestResult::failed(
                item.clone(),
                RequestFailureKind::PrerequisiteConfiguration,
                format!(
                    "Automated configuration checks failed. Authorizations will not be able to complete.\n\
                     Check you have http bindings for your site and ensure you can browse to \
                     http://{}/.well-known/acme-challenge/configcheck before proceeding.",
                    failed.domain
                ),
                reports,
            );
        }

        let failed_domains: Vec<&str> = failures.iter().map(|v| v.domain.as_str()).collect();
        CertificateRequestResult::failed(
            item.clone(),
            RequestFailureKind::Validation,
            format!(
                "Validation of the required challenges did not complete successfully for: {}. \
                 Please ensure all domains to be referenced in the certificate can be used to \
                 access this site without redirection.",
                failed_domains.join(", ")
            ),
            reports,
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "collaborator panicked".to_string()
    }
}
