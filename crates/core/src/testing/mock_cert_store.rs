//! Mock certificate store for testing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;

use crate::cert_store::{CertStoreError, CertificateDates, CertificateStore};

/// Mock implementation of the CertificateStore trait.
///
/// Returns the configured validity window for every artifact, or a parse
/// error once `set_unreadable` is called.
#[derive(Debug)]
pub struct MockCertificateStore {
    dates: Arc<RwLock<CertificateDates>>,
    unreadable: Arc<RwLock<bool>>,
    reads: Arc<RwLock<Vec<PathBuf>>>,
}

impl Default for MockCertificateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCertificateStore {
    /// Create a new mock store returning `MockCertificateStore::default_dates()`.
    pub fn new() -> Self {
        Self {
            dates: Arc::new(RwLock::new(Self::default_dates())),
            unreadable: Arc::new(RwLock::new(false)),
            reads: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// 2026-01-01 to 2026-04-01, UTC midnight.
    pub fn default_dates() -> CertificateDates {
        CertificateDates {
            not_before: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
        }
    }

    /// Set the validity window returned for every artifact.
    pub async fn set_dates(&self, dates: CertificateDates) {
        *self.dates.write().await = dates;
    }

    /// Make every read fail with a parse error.
    pub async fn set_unreadable(&self, unreadable: bool) {
        *self.unreadable.write().await = unreadable;
    }

    /// Artifact paths read so far.
    pub async fn reads(&self) -> Vec<PathBuf> {
        self.reads.read().await.clone()
    }
}

#[async_trait]
impl CertificateStore for MockCertificateStore {
    async fn read_certificate_dates(
        &self,
        artifact_path: &Path,
    ) -> Result<CertificateDates, CertStoreError> {
        self.reads.write().await.push(artifact_path.to_path_buf());

        if *self.unreadable.read().await {
            return Err(CertStoreError::Parse {
                path: artifact_path.to_path_buf(),
                reason: "mock certificate is unreadable".to_string(),
            });
        }
        Ok(*self.dates.read().await)
    }
}
