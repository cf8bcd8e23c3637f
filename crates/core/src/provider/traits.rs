//! Trait definition for the protocol/vault client.

use async_trait::async_trait;

use crate::item::{ChallengeType, RequestConfig};

use super::error::ProviderError;
use super::types::{DomainIdentifier, IssuanceOutcome, PendingAuthorization};

/// Client for the certificate authority and its local vault.
///
/// Implementations own the bounded wait for challenge completion and
/// report an expired wait as `ProviderError::Timeout`. The vault behind an
/// implementation is single-writer; callers must not run two requests
/// against the same provider session concurrently.
#[async_trait]
pub trait AcmeProvider: Send + Sync {
    /// Returns the name of this provider implementation.
    fn name(&self) -> &str;

    /// Identifier id to register a domain under when no existing identifier
    /// is reused.
    fn compute_identifier_id(&self, domain: &str) -> String;

    /// Existing identifier for a domain, if the vault knows one.
    async fn get_domain_identifier(
        &self,
        domain: &str,
    ) -> Result<Option<DomainIdentifier>, ProviderError>;

    /// Register the identifier (if needed) and request authorization.
    async fn begin_registration_and_validation(
        &self,
        config: &RequestConfig,
        identifier_id: &str,
        challenge_type: ChallengeType,
        domain: &str,
    ) -> Result<PendingAuthorization, ProviderError>;

    /// Ask the authority to check the published challenge response.
    async fn submit_challenge(
        &self,
        identifier_id: &str,
        challenge_type: ChallengeType,
    ) -> Result<(), ProviderError>;

    /// Wait for the authority's verdict on a submitted challenge.
    async fn complete_identifier_validation(
        &self,
        identifier_alias: &str,
    ) -> Result<bool, ProviderError>;

    /// Request a certificate covering the validated identifiers.
    async fn request_issuance(
        &self,
        primary_domain: &str,
        alternative_domains: &[String],
    ) -> Result<IssuanceOutcome, ProviderError>;
}
