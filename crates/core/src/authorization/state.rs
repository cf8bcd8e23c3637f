use serde::{Deserialize, Serialize};

use super::ReuseDecision;

/// Why a domain did not validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The authority checked the challenge response and rejected it.
    ValidationRejected,
    /// The provider's bounded wait for the authority's verdict expired.
    ValidationTimedOut,
    /// The configuration probe could not reach the challenge location.
    PrerequisiteConfiguration,
    /// The provider left the identifier neither pending nor valid.
    NotAuthorized,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ValidationRejected => "validation_rejected",
            FailureReason::ValidationTimedOut => "validation_timed_out",
            FailureReason::PrerequisiteConfiguration => "prerequisite_configuration",
            FailureReason::NotAuthorized => "not_authorized",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FailureReason::ValidationRejected => "domain validation failed",
            FailureReason::ValidationTimedOut => "domain validation timed out",
            FailureReason::PrerequisiteConfiguration => "prerequisite configuration failed",
            FailureReason::NotAuthorized => "no authorization was granted",
        };
        f.write_str(text)
    }
}

/// Where one domain stands within a single certificate request.
///
/// ```text
/// Unvalidated ──> AwaitingChallenge ──> Validated
///      │                  │
///      │                  └──> Failed(reason)
///      └──> Validated (provider fast path)
/// ReusedPending ──> AwaitingChallenge
/// ReusedValid (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum DomainValidationState {
    Unvalidated,
    ReusedPending,
    ReusedValid,
    AwaitingChallenge,
    Validated,
    Failed(FailureReason),
}

impl DomainValidationState {
    /// Starting state implied by a reuse decision.
    pub fn initial(decision: &ReuseDecision) -> Self {
        match decision {
            ReuseDecision::AlreadyValid(_) => DomainValidationState::ReusedValid,
            ReuseDecision::ContinuePending(_) => DomainValidationState::ReusedPending,
            ReuseDecision::RegisterFresh => DomainValidationState::Unvalidated,
        }
    }

    /// Whether the domain can be included in an issuance request.
    pub fn is_validated(&self) -> bool {
        matches!(
            self,
            DomainValidationState::Validated | DomainValidationState::ReusedValid
        )
    }

    /// Whether no further transitions happen within this request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DomainValidationState::Validated
                | DomainValidationState::ReusedValid
                | DomainValidationState::Failed(_)
        )
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            DomainValidationState::Failed(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainValidationState::Unvalidated => "unvalidated",
            DomainValidationState::ReusedPending => "reused_pending",
            DomainValidationState::ReusedValid => "reused_valid",
            DomainValidationState::AwaitingChallenge => "awaiting_challenge",
            DomainValidationState::Validated => "validated",
            DomainValidationState::Failed(_) => "failed",
        }
    }
}
