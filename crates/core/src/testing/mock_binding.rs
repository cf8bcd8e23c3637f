//! Mock binding administrator for testing.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::binding::{BindingAdmin, BindingError, SiteState};
use crate::item::{ManagedCertificateItem, RequestConfig};
use crate::provider::PendingAuthorization;

/// A recorded certificate installation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInstall {
    pub primary_domain: String,
    pub artifact_path: PathBuf,
    pub cleanup_store: bool,
}

/// Mock implementation of the BindingAdmin trait.
///
/// Provides controllable behavior for testing:
/// - Record challenge placements and installs
/// - Fail the configuration probe for chosen domains
/// - Reject or fail installation
/// - Report per-item site states (default `Running`)
#[derive(Debug)]
pub struct MockBindingAdmin {
    placements: Arc<RwLock<Vec<String>>>,
    installs: Arc<RwLock<Vec<RecordedInstall>>>,
    site_checks: Arc<RwLock<Vec<String>>>,
    failing_probes: Arc<RwLock<HashSet<String>>>,
    site_states: Arc<RwLock<HashMap<String, SiteState>>>,
    failing_site_checks: Arc<RwLock<HashSet<String>>>,
    install_result: Arc<RwLock<bool>>,
    /// If set, the next placement or install will fail with this error.
    next_error: Arc<RwLock<Option<BindingError>>>,
}

impl Default for MockBindingAdmin {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBindingAdmin {
    /// Create a new mock binding administrator.
    pub fn new() -> Self {
        Self {
            placements: Arc::new(RwLock::new(Vec::new())),
            installs: Arc::new(RwLock::new(Vec::new())),
            site_checks: Arc::new(RwLock::new(Vec::new())),
            failing_probes: Arc::new(RwLock::new(HashSet::new())),
            site_states: Arc::new(RwLock::new(HashMap::new())),
            failing_site_checks: Arc::new(RwLock::new(HashSet::new())),
            install_result: Arc::new(RwLock::new(true)),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Domains a challenge response was placed for, in order.
    pub async fn placements(&self) -> Vec<String> {
        self.placements.read().await.clone()
    }

    /// Recorded installations.
    pub async fn installs(&self) -> Vec<RecordedInstall> {
        self.installs.read().await.clone()
    }

    /// Item ids whose site state was queried, in order.
    pub async fn site_checks(&self) -> Vec<String> {
        self.site_checks.read().await.clone()
    }

    /// Make the configuration probe fail for a domain.
    pub async fn fail_probe(&self, domain: &str) {
        self.failing_probes.write().await.insert(domain.to_string());
    }

    /// Set the reported state of an item's site.
    pub async fn set_site_state(&self, item_id: &str, state: SiteState) {
        self.site_states
            .write()
            .await
            .insert(item_id.to_string(), state);
    }

    /// Make the site state query for an item fail.
    pub async fn fail_site_check(&self, item_id: &str) {
        self.failing_site_checks
            .write()
            .await
            .insert(item_id.to_string());
    }

    /// Set what `install_certificate` returns when it does not error.
    pub async fn set_install_result(&self, installed: bool) {
        *self.install_result.write().await = installed;
    }

    /// Configure the next placement or install to fail with the given error.
    pub async fn set_next_error(&self, error: BindingError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl BindingAdmin for MockBindingAdmin {
    fn name(&self) -> &str {
        "mock"
    }

    async fn place_challenge_response(
        &self,
        config: &RequestConfig,
        mut authorization: PendingAuthorization,
    ) -> Result<PendingAuthorization, BindingError> {
        let domain = authorization.domain().to_string();
        self.placements.write().await.push(domain.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if config.perform_auto_config {
            authorization.config_check_ok = !self.failing_probes.read().await.contains(&domain);
        }
        Ok(authorization)
    }

    async fn install_certificate(
        &self,
        config: &RequestConfig,
        artifact_path: &Path,
        cleanup_store: bool,
    ) -> Result<bool, BindingError> {
        self.installs.write().await.push(RecordedInstall {
            primary_domain: config.primary_domain.clone(),
            artifact_path: artifact_path.to_path_buf(),
            cleanup_store,
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(*self.install_result.read().await)
    }

    async fn site_state(&self, item: &ManagedCertificateItem) -> Result<SiteState, BindingError> {
        self.site_checks.write().await.push(item.id.clone());

        if self.failing_site_checks.read().await.contains(&item.id) {
            return Err(BindingError::Io(std::io::Error::other("site query failed")));
        }
        Ok(self
            .site_states
            .read()
            .await
            .get(&item.id)
            .copied()
            .unwrap_or(SiteState::Running))
    }
}
