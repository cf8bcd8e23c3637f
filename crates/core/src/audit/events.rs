use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Managed item lifecycle
    ItemSaved {
        item_id: String,
        name: String,
        saved_by: String,
        /// False when an existing item was replaced
        created: bool,
    },
    ItemDeleted {
        item_id: String,
        name: String,
        deleted_by: String,
    },

    // Certificate requests
    /// A certificate request started for an item.
    RequestStarted {
        item_id: String,
        item_name: String,
        /// Distinct domains in validation order, primary first
        domains: Vec<String>,
    },

    /// A domain validation attempt began.
    DomainValidationStarted {
        item_id: String,
        domain: String,
        /// Reuse decision: "already_valid", "continue_pending" or "register_fresh"
        decision: String,
    },

    /// A domain reached its final validation state for this request.
    DomainValidationCompleted {
        item_id: String,
        domain: String,
        /// Final state tag (e.g. "validated", "reused_valid", "failed")
        state: String,
        validated: bool,
        /// Failure detail when not validated
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The provider issued a certificate.
    CertificateIssued {
        item_id: String,
        primary_domain: String,
        alternative_domains: Vec<String>,
        artifact_path: String,
    },

    /// The provider declined or failed issuance.
    IssuanceFailed {
        item_id: String,
        primary_domain: String,
        error: String,
    },

    /// The certificate was bound, or left ready for manual binding.
    CertificateInstalled {
        item_id: String,
        artifact_path: String,
        /// Whether the binding installer was invoked
        automated: bool,
    },

    /// The binding installer rejected the certificate.
    InstallationFailed {
        item_id: String,
        artifact_path: String,
        error: String,
    },

    /// Validity dates could not be read from the artifact.
    CertificateDatesUnreadable {
        item_id: String,
        artifact_path: String,
        error: String,
    },

    /// Certificate request finished (summary event).
    RequestCompleted {
        item_id: String,
        success: bool,
        message: String,
        /// Failure kind when unsuccessful
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure: Option<String>,
        duration_ms: u64,
    },

    // Renewal passes
    RenewalPassStarted {
        triggered_by: String,
        /// Items loaded before filtering
        candidates: u32,
    },
    /// A due or not-due item was left alone by a renewal pass.
    RenewalSkipped {
        item_id: String,
        item_name: String,
        /// "certificate_still_valid" or "site_stopped"
        reason: String,
    },
    RenewalPassCompleted {
        processed: u32,
        succeeded: u32,
        failed: u32,
        skipped: u32,
        duration_ms: u64,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::ItemSaved { .. } => "item_saved",
            Self::ItemDeleted { .. } => "item_deleted",
            Self::RequestStarted { .. } => "request_started",
            Self::DomainValidationStarted { .. } => "domain_validation_started",
            Self::DomainValidationCompleted { .. } => "domain_validation_completed",
            Self::CertificateIssued { .. } => "certificate_issued",
            Self::IssuanceFailed { .. } => "issuance_failed",
            Self::CertificateInstalled { .. } => "certificate_installed",
            Self::InstallationFailed { .. } => "installation_failed",
            Self::CertificateDatesUnreadable { .. } => "certificate_dates_unreadable",
            Self::RequestCompleted { .. } => "request_completed",
            Self::RenewalPassStarted { .. } => "renewal_pass_started",
            Self::RenewalSkipped { .. } => "renewal_skipped",
            Self::RenewalPassCompleted { .. } => "renewal_pass_completed",
        }
    }

    /// Extract item_id if this event concerns one managed item
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::ItemSaved { item_id, .. }
            | Self::ItemDeleted { item_id, .. }
            | Self::RequestStarted { item_id, .. }
            | Self::DomainValidationStarted { item_id, .. }
            | Self::DomainValidationCompleted { item_id, .. }
            | Self::CertificateIssued { item_id, .. }
            | Self::IssuanceFailed { item_id, .. }
            | Self::CertificateInstalled { item_id, .. }
            | Self::InstallationFailed { item_id, .. }
            | Self::CertificateDatesUnreadable { item_id, .. }
            | Self::RequestCompleted { item_id, .. }
            | Self::RenewalSkipped { item_id, .. } => Some(item_id),
            Self::ServiceStarted { .. }
            | Self::ServiceStopped { .. }
            | Self::RenewalPassStarted { .. }
            | Self::RenewalPassCompleted { .. } => None,
        }
    }

    /// Extract who initiated the action, if recorded
    pub fn actor(&self) -> Option<&str> {
        match self {
            Self::ItemSaved { saved_by, .. } => Some(saved_by),
            Self::ItemDeleted { deleted_by, .. } => Some(deleted_by),
            Self::RenewalPassStarted { triggered_by, .. } => Some(triggered_by),
            _ => None,
        }
    }
}

/// Stored audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub item_id: Option<String>,
    pub actor: Option<String>,
    pub data: AuditEvent,
}
