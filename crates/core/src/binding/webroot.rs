//! Webroot-based binding administrator.
//!
//! Publishes HTTP-01 responses as files under the site's webroot and
//! installs certificates by copying the issued artifact into an install
//! directory that the web server's TLS configuration points at.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::WebrootConfig;
use crate::item::{ManagedCertificateItem, RequestConfig};
use crate::provider::PendingAuthorization;

use super::error::BindingError;
use super::traits::{BindingAdmin, SiteState};

/// Name of the probe file written next to challenge responses.
pub const CONFIG_CHECK_FILE: &str = "configcheck";

const CHALLENGE_DIR: &str = ".well-known/acme-challenge";
const CONFIG_CHECK_CONTENT: &str = "certward configuration check";

/// Binding administrator for sites served from a local webroot.
pub struct WebrootBindingAdmin {
    config: WebrootConfig,
    client: Client,
}

impl WebrootBindingAdmin {
    /// Creates a new webroot administrator.
    pub fn new(config: WebrootConfig) -> Result<Self, BindingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()
            .map_err(|e| BindingError::Io(std::io::Error::other(e.to_string())))?;
        Ok(Self { config, client })
    }

    /// Where the certificate for a request is installed.
    pub fn install_path(&self, config: &RequestConfig) -> PathBuf {
        let name = config.primary_domain.trim().to_ascii_lowercase().replace('*', "_wildcard");
        match config.binding_port {
            Some(port) if port != 443 => self.config.install_dir.join(format!("{}-{}.pem", name, port)),
            _ => self.config.install_dir.join(format!("{}.pem", name)),
        }
    }

    fn website_root<'a>(&self, config: &'a RequestConfig) -> Result<&'a Path, BindingError> {
        config
            .website_root_path
            .as_deref()
            .ok_or_else(|| BindingError::MissingWebsiteRoot {
                domain: config.primary_domain.clone(),
            })
    }

    /// Write `contents` to `path`, creating parent directories.
    async fn write_file(path: &Path, contents: &[u8]) -> Result<(), BindingError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BindingError::write_failed(parent.to_path_buf(), e))?;
        }
        fs::write(path, contents)
            .await
            .map_err(|e| BindingError::write_failed(path.to_path_buf(), e))
    }

    fn probe_url(&self, domain: &str) -> String {
        match self.config.probe_port {
            80 => format!("http://{}/{}/{}", domain, CHALLENGE_DIR, CONFIG_CHECK_FILE),
            port => format!(
                "http://{}:{}/{}/{}",
                domain, port, CHALLENGE_DIR, CONFIG_CHECK_FILE
            ),
        }
    }

    /// Fetch the probe file over HTTP and compare its content.
    async fn probe(&self, domain: &str) -> bool {
        let url = self.probe_url(domain);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let body = response.text().await.unwrap_or_default();
                let ok = body.trim() == CONFIG_CHECK_CONTENT;
                if !ok {
                    warn!("Configuration check at {} returned unexpected content", url);
                }
                ok
            }
            Ok(response) => {
                warn!(
                    "Configuration check at {} failed with HTTP {}",
                    url,
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("Configuration check at {} failed: {}", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl BindingAdmin for WebrootBindingAdmin {
    fn name(&self) -> &str {
        "webroot"
    }

    async fn place_challenge_response(
        &self,
        config: &RequestConfig,
        mut authorization: PendingAuthorization,
    ) -> Result<PendingAuthorization, BindingError> {
        let root = self.website_root(config)?;
        let domain = authorization.domain().to_string();
        let challenge = authorization
            .challenge
            .as_ref()
            .ok_or_else(|| BindingError::MissingChallenge {
                domain: domain.clone(),
            })?;

        let response_path = root.join(challenge.resource_path());
        Self::write_file(&response_path, challenge.key_authorization.as_bytes()).await?;
        debug!("Wrote challenge response for {} to {:?}", domain, response_path);

        if config.perform_auto_config {
            let check_path = root.join(CHALLENGE_DIR).join(CONFIG_CHECK_FILE);
            Self::write_file(&check_path, CONFIG_CHECK_CONTENT.as_bytes()).await?;
            authorization.config_check_ok = self.probe(&domain).await;
        }

        Ok(authorization)
    }

    async fn install_certificate(
        &self,
        config: &RequestConfig,
        artifact_path: &Path,
        cleanup_store: bool,
    ) -> Result<bool, BindingError> {
        let contents = fs::read(artifact_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BindingError::ArtifactNotFound {
                    path: artifact_path.to_path_buf(),
                }
            } else {
                BindingError::Io(e)
            }
        })?;

        if contents.is_empty() {
            warn!("Certificate artifact {:?} is empty", artifact_path);
            return Ok(false);
        }

        let destination = self.install_path(config);
        if !cleanup_store && fs::try_exists(&destination).await.unwrap_or(false) {
            let backup = destination.with_extension("pem.bak");
            fs::rename(&destination, &backup).await?;
            debug!("Kept previous certificate at {:?}", backup);
        }

        // Write beside the destination, then rename into place.
        let staging = destination.with_extension("pem.tmp");
        Self::write_file(&staging, &contents).await?;
        fs::rename(&staging, &destination).await?;

        info!(
            "Installed certificate for {} at {:?}",
            config.primary_domain, destination
        );
        Ok(true)
    }

    async fn site_state(&self, item: &ManagedCertificateItem) -> Result<SiteState, BindingError> {
        let Some(root) = item.request_config.website_root_path.as_deref() else {
            return Ok(SiteState::Unknown);
        };

        match fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => Ok(SiteState::Running),
            Ok(_) => Ok(SiteState::Stopped),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SiteState::Stopped),
            Err(e) => Err(BindingError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{CreateItemRequest, ManagedItemType};
    use crate::provider::{DomainIdentifier, HttpChallengeResponse, IdentifierStatus};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn admin(install_dir: &Path, probe_port: u16) -> WebrootBindingAdmin {
        WebrootBindingAdmin::new(WebrootConfig {
            install_dir: install_dir.to_path_buf(),
            probe_timeout_secs: 2,
            probe_port,
        })
        .unwrap()
    }

    fn authorization(domain: &str) -> PendingAuthorization {
        PendingAuthorization {
            identifier: DomainIdentifier {
                id: "ident-1".to_string(),
                alias: "ident-1".to_string(),
                dns: domain.to_string(),
                status: IdentifierStatus::Pending,
                authorization_expiry: None,
                authorization_pending: true,
            },
            challenge: Some(HttpChallengeResponse {
                token: "tok3n".to_string(),
                key_authorization: "tok3n.thumb".to_string(),
            }),
            config_check_ok: false,
        }
    }

    /// Serve a single HTTP response with the given body.
    async fn serve_once(body: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        port
    }

    #[tokio::test]
    async fn test_place_challenge_without_probe() {
        let webroot = TempDir::new().unwrap();
        let install = TempDir::new().unwrap();
        let admin = admin(install.path(), 80);

        let mut config = RequestConfig::new("example.com").with_website_root(webroot.path());
        config.perform_auto_config = false;

        let result = admin
            .place_challenge_response(&config, authorization("example.com"))
            .await
            .unwrap();

        assert!(!result.config_check_ok);
        let written = std::fs::read_to_string(
            webroot.path().join(".well-known/acme-challenge/tok3n"),
        )
        .unwrap();
        assert_eq!(written, "tok3n.thumb");
    }

    #[tokio::test]
    async fn test_place_challenge_with_successful_probe() {
        let webroot = TempDir::new().unwrap();
        let install = TempDir::new().unwrap();
        let port = serve_once(CONFIG_CHECK_CONTENT).await;
        let admin = admin(install.path(), port);

        let config = RequestConfig::new("127.0.0.1").with_website_root(webroot.path());
        let result = admin
            .place_challenge_response(&config, authorization("127.0.0.1"))
            .await
            .unwrap();

        assert!(result.config_check_ok);
        assert!(webroot
            .path()
            .join(".well-known/acme-challenge")
            .join(CONFIG_CHECK_FILE)
            .exists());
    }

    #[tokio::test]
    async fn test_place_challenge_with_wrong_probe_content() {
        let webroot = TempDir::new().unwrap();
        let install = TempDir::new().unwrap();
        let port = serve_once("default site").await;
        let admin = admin(install.path(), port);

        let config = RequestConfig::new("127.0.0.1").with_website_root(webroot.path());
        let result = admin
            .place_challenge_response(&config, authorization("127.0.0.1"))
            .await
            .unwrap();

        assert!(!result.config_check_ok);
    }

    #[tokio::test]
    async fn test_place_challenge_requires_webroot() {
        let install = TempDir::new().unwrap();
        let admin = admin(install.path(), 80);
        let config = RequestConfig::new("example.com");

        let result = admin
            .place_challenge_response(&config, authorization("example.com"))
            .await;
        assert!(matches!(result, Err(BindingError::MissingWebsiteRoot { .. })));
    }

    #[tokio::test]
    async fn test_install_certificate_keeps_backup() {
        let install = TempDir::new().unwrap();
        let artifacts = TempDir::new().unwrap();
        let admin = admin(install.path(), 80);
        let config = RequestConfig::new("example.com");

        let first = artifacts.path().join("first.pem");
        std::fs::write(&first, "FIRST").unwrap();
        assert!(admin.install_certificate(&config, &first, false).await.unwrap());

        let second = artifacts.path().join("second.pem");
        std::fs::write(&second, "SECOND").unwrap();
        assert!(admin.install_certificate(&config, &second, false).await.unwrap());

        let installed = admin.install_path(&config);
        assert_eq!(std::fs::read_to_string(&installed).unwrap(), "SECOND");
        assert_eq!(
            std::fs::read_to_string(installed.with_extension("pem.bak")).unwrap(),
            "FIRST"
        );
    }

    #[tokio::test]
    async fn test_install_certificate_with_cleanup_overwrites() {
        let install = TempDir::new().unwrap();
        let artifacts = TempDir::new().unwrap();
        let admin = admin(install.path(), 80);
        let mut config = RequestConfig::new("example.com");
        config.binding_port = Some(8443);

        let artifact = artifacts.path().join("cert.pem");
        std::fs::write(&artifact, "CERT").unwrap();
        assert!(admin.install_certificate(&config, &artifact, true).await.unwrap());
        assert!(admin.install_certificate(&config, &artifact, true).await.unwrap());

        let installed = admin.install_path(&config);
        assert!(installed.ends_with("example.com-8443.pem"));
        assert!(!installed.with_extension("pem.bak").exists());
    }

    #[tokio::test]
    async fn test_install_missing_or_empty_artifact() {
        let install = TempDir::new().unwrap();
        let admin = admin(install.path(), 80);
        let config = RequestConfig::new("example.com");

        let missing = admin
            .install_certificate(&config, Path::new("/nonexistent/cert.pem"), true)
            .await;
        assert!(matches!(missing, Err(BindingError::ArtifactNotFound { .. })));

        let empty = install.path().join("empty.pem");
        std::fs::write(&empty, "").unwrap();
        assert!(!admin.install_certificate(&config, &empty, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_site_state() {
        let install = TempDir::new().unwrap();
        let webroot = TempDir::new().unwrap();
        let admin = admin(install.path(), 80);

        let mut item = ManagedCertificateItem::new(CreateItemRequest {
            name: "Example".to_string(),
            item_type: ManagedItemType::WebServerBound,
            include_in_auto_renew: true,
            request_config: RequestConfig::new("example.com"),
            group_id: None,
            comments: None,
        });
        assert_eq!(admin.site_state(&item).await.unwrap(), SiteState::Unknown);

        item.request_config.website_root_path = Some(webroot.path().to_path_buf());
        assert_eq!(admin.site_state(&item).await.unwrap(), SiteState::Running);

        item.request_config.website_root_path = Some(webroot.path().join("gone"));
        assert_eq!(admin.site_state(&item).await.unwrap(), SiteState::Stopped);
    }
}
