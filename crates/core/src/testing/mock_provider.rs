//! Mock ACME provider for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::item::{ChallengeType, RequestConfig};
use crate::provider::{
    AcmeProvider, DomainIdentifier, HttpChallengeResponse, IdentifierStatus, IssuanceOutcome,
    PendingAuthorization, ProviderError,
};

/// A provider call recorded for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    GetIdentifier {
        domain: String,
    },
    BeginRegistration {
        identifier_id: String,
        domain: String,
    },
    SubmitChallenge {
        identifier_id: String,
    },
    CompleteValidation {
        alias: String,
    },
    RequestIssuance {
        primary_domain: String,
        alternative_domains: Vec<String>,
    },
}

/// How `complete_identifier_validation` answers for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Reject,
    TimeOut,
}

/// Mock implementation of the AcmeProvider trait.
///
/// By default every domain registers as pending with an HTTP challenge,
/// validates successfully, and issuance returns `/certs/<primary>.pem`.
///
/// # Example
///
/// ```rust,ignore
/// use certward_core::testing::MockAcmeProvider;
///
/// let provider = MockAcmeProvider::new();
/// provider.reject_validation("b.example.com").await;
///
/// // ... run a request ...
///
/// assert_eq!(provider.issuance_requests().await.len(), 0);
/// ```
#[derive(Debug)]
pub struct MockAcmeProvider {
    calls: Arc<RwLock<Vec<ProviderCall>>>,
    /// Existing identifiers returned by `get_domain_identifier`.
    identifiers: Arc<RwLock<HashMap<String, DomainIdentifier>>>,
    /// Domains whose registration returns an already-valid identifier.
    fast_path: Arc<RwLock<HashSet<String>>>,
    verdicts: Arc<RwLock<HashMap<String, Verdict>>>,
    /// Alias to domain, recorded at registration.
    aliases: Arc<RwLock<HashMap<String, String>>>,
    issuance: Arc<RwLock<Option<IssuanceOutcome>>>,
    /// Primary domains whose issuance panics.
    crashing: Arc<RwLock<HashSet<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ProviderError>>>,
    /// Simulated latency of every async operation.
    delay: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockAcmeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAcmeProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            identifiers: Arc::new(RwLock::new(HashMap::new())),
            fast_path: Arc::new(RwLock::new(HashSet::new())),
            verdicts: Arc::new(RwLock::new(HashMap::new())),
            aliases: Arc::new(RwLock::new(HashMap::new())),
            issuance: Arc::new(RwLock::new(None)),
            crashing: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get all recorded calls, in order.
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Recorded issuance requests as (primary, alternatives).
    pub async fn issuance_requests(&self) -> Vec<(String, Vec<String>)> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                ProviderCall::RequestIssuance {
                    primary_domain,
                    alternative_domains,
                } => Some((primary_domain.clone(), alternative_domains.clone())),
                _ => None,
            })
            .collect()
    }

    /// Domains passed to `begin_registration_and_validation`, in order.
    pub async fn registered_domains(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                ProviderCall::BeginRegistration { domain, .. } => Some(domain.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `submit_challenge` calls.
    pub async fn submitted_challenge_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| matches!(call, ProviderCall::SubmitChallenge { .. }))
            .count()
    }

    /// Make `get_domain_identifier` return this identifier for its domain.
    pub async fn add_identifier(&self, identifier: DomainIdentifier) {
        self.identifiers
            .write()
            .await
            .insert(identifier.dns.clone(), identifier);
    }

    /// Make registration for a domain return an identifier that is already valid.
    pub async fn set_already_valid(&self, domain: &str) {
        self.fast_path.write().await.insert(domain.to_string());
    }

    /// Make validation of a domain come back negative.
    pub async fn reject_validation(&self, domain: &str) {
        self.verdicts
            .write()
            .await
            .insert(domain.to_string(), Verdict::Reject);
    }

    /// Make the validation wait for a domain expire.
    pub async fn time_out_validation(&self, domain: &str) {
        self.verdicts
            .write()
            .await
            .insert(domain.to_string(), Verdict::TimeOut);
    }

    /// Set the outcome of subsequent issuance requests.
    pub async fn set_issuance_outcome(&self, outcome: IssuanceOutcome) {
        *self.issuance.write().await = Some(outcome);
    }

    /// Make issuance for `primary_domain` panic, as a broken client might.
    pub async fn crash_on_issuance(&self, primary_domain: &str) {
        self.crashing
            .write()
            .await
            .insert(primary_domain.to_string());
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ProviderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated latency of every async operation.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Highest number of operations observed running at the same time.
    pub fn max_concurrent_operations(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: ProviderCall) -> Result<InFlight<'_>, ProviderError> {
        self.calls.write().await.push(call);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(guard)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AcmeProvider for MockAcmeProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn compute_identifier_id(&self, domain: &str) -> String {
        format!("ident-{}", domain)
    }

    async fn get_domain_identifier(
        &self,
        domain: &str,
    ) -> Result<Option<DomainIdentifier>, ProviderError> {
        let _guard = self
            .enter(ProviderCall::GetIdentifier {
                domain: domain.to_string(),
            })
            .await?;
        Ok(self.identifiers.read().await.get(domain).cloned())
    }

    async fn begin_registration_and_validation(
        &self,
        _config: &RequestConfig,
        identifier_id: &str,
        _challenge_type: ChallengeType,
        domain: &str,
    ) -> Result<PendingAuthorization, ProviderError> {
        let _guard = self
            .enter(ProviderCall::BeginRegistration {
                identifier_id: identifier_id.to_string(),
                domain: domain.to_string(),
            })
            .await?;

        let alias = format!("{}-alias", identifier_id);
        self.aliases
            .write()
            .await
            .insert(alias.clone(), domain.to_string());

        let already_valid = self.fast_path.read().await.contains(domain);
        let identifier = DomainIdentifier {
            id: identifier_id.to_string(),
            alias,
            dns: domain.to_string(),
            status: if already_valid {
                IdentifierStatus::Valid
            } else {
                IdentifierStatus::Pending
            },
            authorization_expiry: None,
            authorization_pending: !already_valid,
        };

        if already_valid {
            return Ok(PendingAuthorization::from_identifier(identifier));
        }

        Ok(PendingAuthorization {
            identifier,
            challenge: Some(HttpChallengeResponse {
                token: format!("token-{}", domain),
                key_authorization: format!("token-{}.thumbprint", domain),
            }),
            config_check_ok: false,
        })
    }

    async fn submit_challenge(
        &self,
        identifier_id: &str,
        _challenge_type: ChallengeType,
    ) -> Result<(), ProviderError> {
        let _guard = self
            .enter(ProviderCall::SubmitChallenge {
                identifier_id: identifier_id.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn complete_identifier_validation(
        &self,
        identifier_alias: &str,
    ) -> Result<bool, ProviderError> {
        let _guard = self
            .enter(ProviderCall::CompleteValidation {
                alias: identifier_alias.to_string(),
            })
            .await?;

        let domain = self.aliases.read().await.get(identifier_alias).cloned();
        let verdict = match domain {
            Some(domain) => self.verdicts.read().await.get(&domain).copied(),
            None => None,
        };

        match verdict {
            None => Ok(true),
            Some(Verdict::Reject) => Ok(false),
            Some(Verdict::TimeOut) => Err(ProviderError::Timeout),
        }
    }

    async fn request_issuance(
        &self,
        primary_domain: &str,
        alternative_domains: &[String],
    ) -> Result<IssuanceOutcome, ProviderError> {
        let _guard = self
            .enter(ProviderCall::RequestIssuance {
                primary_domain: primary_domain.to_string(),
                alternative_domains: alternative_domains.to_vec(),
            })
            .await?;

        if self.crashing.read().await.contains(primary_domain) {
            panic!("issuance client crashed for {}", primary_domain);
        }

        let configured = self.issuance.read().await.clone();
        Ok(configured
            .unwrap_or_else(|| IssuanceOutcome::issued(format!("/certs/{}.pem", primary_domain))))
    }
}
