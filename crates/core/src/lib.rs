pub mod audit;
pub mod authorization;
pub mod binding;
pub mod cert_store;
pub mod challenge;
pub mod config;
pub mod item;
pub mod metrics;
pub mod provider;
pub mod renewal;
pub mod request;
pub mod testing;

pub use audit::{
    create_audit_system, AuditEvent, AuditFilter, AuditHandle, AuditRecord, AuditStore,
    SqliteAuditStore,
};
pub use authorization::{resolve_reuse, DomainValidationState, FailureReason, ReuseDecision};
pub use binding::{BindingAdmin, BindingError, SiteState, WebrootBindingAdmin};
pub use cert_store::{CertStoreError, CertificateDates, CertificateStore, PemCertificateStore};
pub use challenge::{ChallengeCoordinator, CoordinatorError, DomainValidation};
pub use config::{
    load_config, load_config_from_str, validate_config, AcmeConfig, Config, ConfigError,
    DatabaseConfig, RenewalConfig, SanitizedConfig, ServerConfig, VaultConfig, WebrootConfig,
};
pub use item::{
    is_valid_domain, CreateItemRequest, ItemFilter, ItemStoreError, ManagedCertificateItem,
    ManagedItemStore, ManagedItemType, RequestConfig, SqliteItemStore,
};
pub use provider::{AcmeProvider, HttpVaultClient, ProviderError};
pub use renewal::{
    ProgressSinks, RenewalPassReport, RenewalPolicy, RenewalScheduler, RenewalService,
    RenewalServiceStatus, SkipReason,
};
pub use request::{
    CertificateRequestResult, CertificateRequester, ProgressSink, RequestFailureKind,
    RequestProgressState, RequestState,
};
