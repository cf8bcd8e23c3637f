//! Certificate store reader.
//!
//! The renewal engine only needs one thing from the certificate store:
//! the validity window of an issued artifact, so managed items can record
//! when their current certificate starts and expires.

mod pem;

pub use pem::PemCertificateStore;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validity window of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDates {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Errors reading a certificate artifact.
#[derive(Debug, Error)]
pub enum CertStoreError {
    #[error("Certificate not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to parse certificate {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reader for issued certificate artifacts.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Read the validity window of the certificate at `artifact_path`.
    async fn read_certificate_dates(
        &self,
        artifact_path: &Path,
    ) -> Result<CertificateDates, CertStoreError>;
}
