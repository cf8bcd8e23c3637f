//! Trait definitions for binding administration.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::item::{ManagedCertificateItem, RequestConfig};
use crate::provider::PendingAuthorization;

use super::error::BindingError;

/// Running state of the site behind a managed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteState {
    Running,
    Stopped,
    /// The site could not be identified or queried.
    Unknown,
}

impl SiteState {
    /// Whether renewal should proceed. Only an explicit `Stopped` blocks it.
    pub fn allows_renewal(&self) -> bool {
        !matches!(self, SiteState::Stopped)
    }
}

/// Administrator for the web server hosting managed sites.
#[async_trait]
pub trait BindingAdmin: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Publish the challenge response for an authorization.
    ///
    /// When `config.perform_auto_config` is set, also probes that the
    /// response location is reachable and records the outcome in
    /// `config_check_ok` of the returned authorization.
    async fn place_challenge_response(
        &self,
        config: &RequestConfig,
        authorization: PendingAuthorization,
    ) -> Result<PendingAuthorization, BindingError>;

    /// Install an issued certificate into the bindings for a request.
    ///
    /// Returns `false` when the installation did not take effect.
    async fn install_certificate(
        &self,
        config: &RequestConfig,
        artifact_path: &Path,
        cleanup_store: bool,
    ) -> Result<bool, BindingError>;

    /// Running state of the site serving an item.
    async fn site_state(&self, item: &ManagedCertificateItem) -> Result<SiteState, BindingError>;
}
