use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authorization::DomainValidationState;
use crate::challenge::{CoordinatorError, DomainValidation};
use crate::item::{ItemStoreError, ManagedCertificateItem};
use crate::provider::ProviderError;

/// Why a certificate request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFailureKind {
    /// One or more domains did not complete challenge validation.
    Validation,
    /// The configuration probe could not confirm the challenge location.
    PrerequisiteConfiguration,
    /// The provider declined or timed out issuing the certificate.
    Issuance,
    /// The certificate was issued but could not be installed.
    Installation,
    /// Any other error, caught at the request boundary.
    Unexpected,
}

impl RequestFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestFailureKind::Validation => "validation",
            RequestFailureKind::PrerequisiteConfiguration => "prerequisite_configuration",
            RequestFailureKind::Issuance => "issuance",
            RequestFailureKind::Installation => "installation",
            RequestFailureKind::Unexpected => "unexpected",
        }
    }
}

/// Final validation state of one domain, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainValidationReport {
    pub domain: String,
    pub validation: DomainValidationState,
}

impl From<&DomainValidation> for DomainValidationReport {
    fn from(validation: &DomainValidation) -> Self {
        Self {
            domain: validation.domain.clone(),
            validation: validation.state,
        }
    }
}

/// Terminal outcome of one certificate request.
///
/// Produced exactly once per request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRequestResult {
    pub success: bool,
    pub message: String,
    /// Item snapshot; carries updated dates and path on success.
    pub item: ManagedCertificateItem,
    /// Installed certificate location on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RequestFailureKind>,
    /// Per-domain outcomes in validation order.
    #[serde(default)]
    pub domains: Vec<DomainValidationReport>,
}

impl CertificateRequestResult {
    pub(crate) fn succeeded(
        item: ManagedCertificateItem,
        message: impl Into<String>,
        certificate_path: PathBuf,
        domains: Vec<DomainValidationReport>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            item,
            certificate_path: Some(certificate_path),
            failure: None,
            domains,
        }
    }

    pub(crate) fn failed(
        item: ManagedCertificateItem,
        kind: RequestFailureKind,
        message: impl Into<String>,
        domains: Vec<DomainValidationReport>,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            item,
            certificate_path: None,
            failure: Some(kind),
            domains,
        }
    }

    /// Metric/audit label: "success" or the failure kind.
    pub fn outcome_label(&self) -> &'static str {
        match self.failure {
            None => "success",
            Some(kind) => kind.as_str(),
        }
    }
}

/// Errors caught by the request boundary and turned into failure results.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to save managed item: {0}")]
    Store(#[from] ItemStoreError),
}
