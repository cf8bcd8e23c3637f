//! PEM file certificate store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use x509_parser::pem::parse_x509_pem;

use super::{CertStoreError, CertificateDates, CertificateStore};

/// Reads validity dates from PEM artifacts on disk.
///
/// Only the first certificate of a chain (the leaf) is inspected.
#[derive(Debug, Default, Clone)]
pub struct PemCertificateStore;

impl PemCertificateStore {
    pub fn new() -> Self {
        Self
    }

    /// Parse the validity window of the first certificate in a PEM buffer.
    pub fn parse_dates(pem_bytes: &[u8]) -> Result<CertificateDates, String> {
        let (_, pem) = parse_x509_pem(pem_bytes).map_err(|e| format!("invalid PEM: {}", e))?;
        let cert = pem
            .parse_x509()
            .map_err(|e| format!("invalid X.509 certificate: {}", e))?;

        let validity = cert.validity();
        let not_before = DateTime::<Utc>::from_timestamp(validity.not_before.timestamp(), 0)
            .ok_or("not_before out of range")?;
        let not_after = DateTime::<Utc>::from_timestamp(validity.not_after.timestamp(), 0)
            .ok_or("not_after out of range")?;

        Ok(CertificateDates {
            not_before,
            not_after,
        })
    }
}

#[async_trait]
impl CertificateStore for PemCertificateStore {
    async fn read_certificate_dates(
        &self,
        artifact_path: &Path,
    ) -> Result<CertificateDates, CertStoreError> {
        let bytes = fs::read(artifact_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CertStoreError::NotFound {
                    path: artifact_path.to_path_buf(),
                }
            } else {
                CertStoreError::Io(e)
            }
        })?;

        Self::parse_dates(&bytes).map_err(|reason| CertStoreError::Parse {
            path: artifact_path.to_path_buf(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use rcgen::{date_time_ymd, CertificateParams, KeyPair};
    use tempfile::TempDir;

    fn generate_pem() -> String {
        let key_pair = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["example.com".to_string()]).unwrap();
        params.not_before = date_time_ymd(2026, 1, 1);
        params.not_after = date_time_ymd(2026, 4, 1);
        params.self_signed(&key_pair).unwrap().pem()
    }

    #[tokio::test]
    async fn test_read_dates_from_pem_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cert.pem");
        std::fs::write(&path, generate_pem()).unwrap();

        let dates = PemCertificateStore::new()
            .read_certificate_dates(&path)
            .await
            .unwrap();

        assert_eq!(dates.not_before, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(dates.not_after.month(), 4);
        assert!(dates.not_before < dates.not_after);
    }

    #[tokio::test]
    async fn test_garbage_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cert.pem");
        std::fs::write(&path, "not a certificate").unwrap();

        let result = PemCertificateStore::new().read_certificate_dates(&path).await;
        assert!(matches!(result, Err(CertStoreError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = PemCertificateStore::new()
            .read_certificate_dates(Path::new("/nonexistent/cert.pem"))
            .await;
        assert!(matches!(result, Err(CertStoreError::NotFound { .. })));
    }
}
