//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait the
//! request engine consumes, so requests and renewal passes can be exercised
//! without a vault, a web server or real certificates.
//!
//! # Example
//!
//! ```rust,ignore
//! use certward_core::testing::{fixtures, MockAcmeProvider, MockBindingAdmin};
//!
//! let provider = MockAcmeProvider::new();
//! let binding = MockBindingAdmin::new();
//!
//! // Configure mock responses
//! provider.reject_validation("www.example.com").await;
//! binding.fail_probe("example.com").await;
//!
//! let item = fixtures::web_item("Example", "example.com", &["www.example.com"]);
//! ```

mod mock_binding;
mod mock_cert_store;
mod mock_provider;

pub use mock_binding::{MockBindingAdmin, RecordedInstall};
pub use mock_cert_store::MockCertificateStore;
pub use mock_provider::{MockAcmeProvider, ProviderCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};

    use crate::item::{
        CreateItemRequest, ManagedCertificateItem, ManagedItemType, RequestConfig,
    };
    use crate::provider::{DomainIdentifier, IdentifierStatus};

    /// Web-server-bound item with automated placement, probing and binding.
    pub fn web_item(name: &str, primary: &str, alternatives: &[&str]) -> ManagedCertificateItem {
        ManagedCertificateItem::new(CreateItemRequest {
            name: name.to_string(),
            item_type: ManagedItemType::WebServerBound,
            include_in_auto_renew: true,
            request_config: RequestConfig::new(primary)
                .with_alternative_names(alternatives.iter().copied())
                .with_website_root(format!("/var/www/{}", primary)),
            group_id: Some(format!("site-{}", primary)),
            comments: None,
        })
    }

    /// Manually bound item: challenges are answered out of band.
    pub fn manual_item(name: &str, primary: &str) -> ManagedCertificateItem {
        ManagedCertificateItem::new(CreateItemRequest {
            name: name.to_string(),
            item_type: ManagedItemType::Manual,
            include_in_auto_renew: true,
            request_config: RequestConfig::new(primary),
            group_id: None,
            comments: None,
        })
    }

    /// Mark an item as last renewed `days` days before `now`.
    pub fn renewed_days_ago(
        mut item: ManagedCertificateItem,
        days: i64,
        now: DateTime<Utc>,
    ) -> ManagedCertificateItem {
        item.date_renewed = Some(now - Duration::days(days));
        item
    }

    /// Provider identifier for a domain expiring `expires_in` from now.
    pub fn identifier(
        domain: &str,
        status: IdentifierStatus,
        expires_in: Duration,
    ) -> DomainIdentifier {
        DomainIdentifier {
            id: format!("existing-{}", domain),
            alias: format!("existing-{}-alias", domain),
            dns: domain.to_string(),
            status,
            authorization_expiry: Some(Utc::now() + expires_in),
            authorization_pending: status == IdentifierStatus::Pending,
        }
    }
}
