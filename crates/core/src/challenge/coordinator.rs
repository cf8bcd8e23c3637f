use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::authorization::{DomainValidationState, FailureReason, ReuseDecision};
use crate::binding::{BindingAdmin, BindingError};
use crate::item::ManagedCertificateItem;
use crate::provider::{AcmeProvider, IdentifierStatus, PendingAuthorization, ProviderError};
use crate::request::{emit, ProgressSink, RequestProgressState};

/// Errors that abort a domain validation instead of failing it.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),
}

/// Final state of one domain within a request.
#[derive(Debug, Clone, Serialize)]
pub struct DomainValidation {
    pub domain: String,
    pub authorization: PendingAuthorization,
    pub state: DomainValidationState,
}

impl DomainValidation {
    pub fn is_validated(&self) -> bool {
        self.state.is_validated()
    }
}

/// Runs the challenge protocol for single domains.
pub struct ChallengeCoordinator {
    provider: Arc<dyn AcmeProvider>,
    binding: Arc<dyn BindingAdmin>,
}

impl ChallengeCoordinator {
    pub fn new(provider: Arc<dyn AcmeProvider>, binding: Arc<dyn BindingAdmin>) -> Self {
        Self { provider, binding }
    }

    /// Validate `domain` for `item`, starting from a reuse decision.
    ///
    /// A negative verdict, an expired validation wait or a failed
    /// configuration probe is reported as `DomainValidationState::Failed`.
    /// Any other provider or binding error is returned.
    pub async fn validate_domain(
        &self,
        item: &ManagedCertificateItem,
        domain: &str,
        decision: ReuseDecision,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<DomainValidation, CoordinatorError> {
        let config = &item.request_config;
        let challenge_type = config.effective_challenge_type();
        let initial = DomainValidationState::initial(&decision);

        let identifier_id = match decision {
            ReuseDecision::AlreadyValid(identifier) => {
                debug!("{} already has a valid authorization", domain);
                return Ok(DomainValidation {
                    domain: domain.to_string(),
                    authorization: PendingAuthorization::from_identifier(identifier),
                    state: initial,
                });
            }
            ReuseDecision::ContinuePending(identifier) => identifier.id,
            ReuseDecision::RegisterFresh => self.provider.compute_identifier_id(domain),
        };

        let mut authorization = self
            .provider
            .begin_registration_and_validation(config, &identifier_id, challenge_type, domain)
            .await?;

        if !authorization.is_pending() {
            let state = if authorization.identifier.status == IdentifierStatus::Valid {
                debug!("Provider reports {} as already valid", domain);
                DomainValidationState::Validated
            } else {
                warn!(
                    "Provider returned no pending authorization for {} (status {})",
                    domain,
                    authorization.identifier.status.as_str()
                );
                DomainValidationState::Failed(FailureReason::NotAuthorized)
            };
            return Ok(DomainValidation {
                domain: domain.to_string(),
                authorization,
                state,
            });
        }

        debug!(
            "{}: {} -> {}",
            domain,
            initial.as_str(),
            DomainValidationState::AwaitingChallenge.as_str()
        );

        if item.item_type.automates_challenge_response() && config.perform_challenge_file_copy {
            emit(
                progress,
                RequestProgressState::running(format!(
                    "Performing challenge response via web server: {}",
                    domain
                )),
            );
            authorization = self
                .binding
                .place_challenge_response(config, authorization)
                .await?;

            if config.perform_auto_config && !authorization.config_check_ok {
                warn!(
                    "Configuration check failed for {} on {}",
                    domain, item.name
                );
                return Ok(DomainValidation {
                    domain: domain.to_string(),
                    authorization,
                    state: DomainValidationState::Failed(FailureReason::PrerequisiteConfiguration),
                });
            }
        }

        emit(
            progress,
            RequestProgressState::running(format!("Requesting validation: {}", domain)),
        );
        self.provider
            .submit_challenge(&identifier_id, challenge_type)
            .await?;

        let state = match self
            .provider
            .complete_identifier_validation(&authorization.identifier.alias)
            .await
        {
            Ok(true) => {
                info!("Domain {} validated", domain);
                DomainValidationState::Validated
            }
            Ok(false) => DomainValidationState::Failed(FailureReason::ValidationRejected),
            Err(e) if e.is_timeout() => {
                warn!("Validation of {} timed out", domain);
                DomainValidationState::Failed(FailureReason::ValidationTimedOut)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(DomainValidation {
            domain: domain.to_string(),
            authorization,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::resolve_reuse;
    use crate::testing::{fixtures, MockAcmeProvider, MockBindingAdmin, ProviderCall};
    use chrono::{Duration, Utc};

    fn setup() -> (Arc<MockAcmeProvider>, Arc<MockBindingAdmin>, ChallengeCoordinator) {
        let provider = Arc::new(MockAcmeProvider::new());
        let binding = Arc::new(MockBindingAdmin::new());
        let coordinator = ChallengeCoordinator::new(
            Arc::clone(&provider) as Arc<dyn AcmeProvider>,
            Arc::clone(&binding) as Arc<dyn BindingAdmin>,
        );
        (provider, binding, coordinator)
    }

    #[tokio::test]
    async fn test_already_valid_makes_no_calls() {
        let (provider, binding, coordinator) = setup();
        let item = fixtures::web_item("Example", "example.com", &[]);
        let identifier =
            fixtures::identifier("example.com", IdentifierStatus::Valid, Duration::days(20));
        let decision = resolve_reuse("example.com", Some(&identifier), true, Utc::now());

        let result = coordinator
            .validate_domain(&item, "example.com", decision, None)
            .await
            .unwrap();

        assert_eq!(result.state, DomainValidationState::ReusedValid);
        assert!(result.is_validated());
        assert!(provider.calls().await.is_empty());
        assert!(binding.placements().await.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_domain_places_submits_and_validates() {
        let (provider, binding, coordinator) = setup();
        let item = fixtures::web_item("Example", "example.com", &[]);

        let result = coordinator
            .validate_domain(&item, "example.com", ReuseDecision::RegisterFresh, None)
            .await
            .unwrap();

        assert_eq!(result.state, DomainValidationState::Validated);
        assert_eq!(binding.placements().await, vec!["example.com"]);
        assert_eq!(
            provider.calls().await,
            vec![
                ProviderCall::BeginRegistration {
                    identifier_id: "ident-example.com".to_string(),
                    domain: "example.com".to_string(),
                },
                ProviderCall::SubmitChallenge {
                    identifier_id: "ident-example.com".to_string(),
                },
                ProviderCall::CompleteValidation {
                    alias: "ident-example.com-alias".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_pending_reuse_continues_existing_identifier() {
        let (provider, _binding, coordinator) = setup();
        let item = fixtures::web_item("Example", "example.com", &[]);
        let identifier =
            fixtures::identifier("example.com", IdentifierStatus::Pending, Duration::days(5));

        let result = coordinator
            .validate_domain(
                &item,
                "example.com",
                ReuseDecision::ContinuePending(identifier),
                None,
            )
            .await
            .unwrap();

        assert!(result.is_validated());
        assert!(provider.calls().await.contains(&ProviderCall::BeginRegistration {
            identifier_id: "existing-example.com".to_string(),
            domain: "example.com".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_provider_fast_path_skips_challenge() {
        let (provider, binding, coordinator) = setup();
        provider.set_already_valid("example.com").await;
        let item = fixtures::web_item("Example", "example.com", &[]);

        let result = coordinator
            .validate_domain(&item, "example.com", ReuseDecision::RegisterFresh, None)
            .await
            .unwrap();

        assert_eq!(result.state, DomainValidationState::Validated);
        assert_eq!(provider.submitted_challenge_count().await, 0);
        assert!(binding.placements().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_probe_is_prerequisite_failure() {
        let (provider, binding, coordinator) = setup();
        binding.fail_probe("example.com").await;
        let item = fixtures::web_item("Example", "example.com", &[]);

        let result = coordinator
            .validate_domain(&item, "example.com", ReuseDecision::RegisterFresh, None)
            .await
            .unwrap();

        assert_eq!(
            result.state,
            DomainValidationState::Failed(FailureReason::PrerequisiteConfiguration)
        );
        assert_eq!(provider.submitted_challenge_count().await, 0);
    }

    #[tokio::test]
    async fn test_probe_not_requested_submits_anyway() {
        let (_provider, binding, coordinator) = setup();
        binding.fail_probe("example.com").await;
        let mut item = fixtures::web_item("Example", "example.com", &[]);
        item.request_config.perform_auto_config = false;

        let result = coordinator
            .validate_domain(&item, "example.com", ReuseDecision::RegisterFresh, None)
            .await
            .unwrap();

        assert_eq!(result.state, DomainValidationState::Validated);
    }

    #[tokio::test]
    async fn test_manual_item_does_not_touch_web_server() {
        let (provider, binding, coordinator) = setup();
        let item = fixtures::manual_item("Manual", "example.com");

        let result = coordinator
            .validate_domain(&item, "example.com", ReuseDecision::RegisterFresh, None)
            .await
            .unwrap();

        assert!(result.is_validated());
        assert!(binding.placements().await.is_empty());
        assert_eq!(provider.submitted_challenge_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejection_and_timeout_are_failures() {
        let (provider, _binding, coordinator) = setup();
        provider.reject_validation("a.com").await;
        provider.time_out_validation("b.com").await;
        let item = fixtures::web_item("Example", "a.com", &["b.com"]);

        let a = coordinator
            .validate_domain(&item, "a.com", ReuseDecision::RegisterFresh, None)
            .await
            .unwrap();
        let b = coordinator
            .validate_domain(&item, "b.com", ReuseDecision::RegisterFresh, None)
            .await
            .unwrap();

        assert_eq!(a.state.failure(), Some(FailureReason::ValidationRejected));
        assert_eq!(b.state.failure(), Some(FailureReason::ValidationTimedOut));
    }

    #[tokio::test]
    async fn test_unexpected_errors_propagate() {
        let (provider, binding, coordinator) = setup();
        let item = fixtures::web_item("Example", "example.com", &[]);

        provider
            .set_next_error(ProviderError::ConnectionFailed("refused".to_string()))
            .await;
        let result = coordinator
            .validate_domain(&item, "example.com", ReuseDecision::RegisterFresh, None)
            .await;
        assert!(matches!(result, Err(CoordinatorError::Provider(_))));

        binding
            .set_next_error(BindingError::MissingWebsiteRoot {
                domain: "example.com".to_string(),
            })
            .await;
        let result = coordinator
            .validate_domain(&item, "example.com", ReuseDecision::RegisterFresh, None)
            .await;
        assert!(matches!(result, Err(CoordinatorError::Binding(_))));
    }
}
