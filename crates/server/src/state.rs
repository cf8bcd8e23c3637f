use std::sync::Arc;

use certward_core::{
    AuditHandle, AuditStore, CertificateRequester, Config, ManagedItemStore, RenewalService,
    SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    items: Arc<dyn ManagedItemStore>,
    requester: Arc<CertificateRequester>,
    renewal: Arc<RenewalService>,
}

impl AppState {
    pub fn new(
        config: Config,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        items: Arc<dyn ManagedItemStore>,
        requester: Arc<CertificateRequester>,
        renewal: Arc<RenewalService>,
    ) -> Self {
        Self {
            config,
            audit,
            audit_store,
            items,
            requester,
            renewal,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn items(&self) -> &dyn ManagedItemStore {
        self.items.as_ref()
    }

    pub fn requester(&self) -> &CertificateRequester {
        self.requester.as_ref()
    }

    pub fn renewal(&self) -> &RenewalService {
        self.renewal.as_ref()
    }
}
