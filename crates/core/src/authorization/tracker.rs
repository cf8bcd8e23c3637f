use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::provider::{DomainIdentifier, IdentifierStatus};

/// An identifier is only reused if its authorization outlives `now` by more
/// than this many days.
pub const REUSE_EXPIRY_MARGIN_DAYS: i64 = 1;

/// What to do about a domain's existing provider identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum ReuseDecision {
    /// The identifier is valid; skip the challenge entirely.
    AlreadyValid(DomainIdentifier),
    /// A challenge is outstanding; continue it under the existing identifier.
    ContinuePending(DomainIdentifier),
    /// Register (or re-register) and validate from scratch.
    RegisterFresh,
}

impl ReuseDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReuseDecision::AlreadyValid(_) => "already_valid",
            ReuseDecision::ContinuePending(_) => "continue_pending",
            ReuseDecision::RegisterFresh => "register_fresh",
        }
    }

    /// The identifier being reused, if any.
    pub fn identifier(&self) -> Option<&DomainIdentifier> {
        match self {
            ReuseDecision::AlreadyValid(identifier) | ReuseDecision::ContinuePending(identifier) => {
                Some(identifier)
            }
            ReuseDecision::RegisterFresh => None,
        }
    }
}

/// Decide whether `lookup` (the provider's current identifier for `domain`)
/// can stand in for a fresh validation round.
///
/// Eligible only when reuse is enabled, the identifier is valid or pending,
/// and its authorization expires strictly later than `now` plus one day.
pub fn resolve_reuse(
    domain: &str,
    lookup: Option<&DomainIdentifier>,
    reuse_enabled: bool,
    now: DateTime<Utc>,
) -> ReuseDecision {
    if !reuse_enabled {
        return ReuseDecision::RegisterFresh;
    }

    let Some(identifier) = lookup else {
        return ReuseDecision::RegisterFresh;
    };

    let unexpired = identifier
        .authorization_expiry
        .is_some_and(|expiry| expiry > now + Duration::days(REUSE_EXPIRY_MARGIN_DAYS));
    if !unexpired {
        debug!(
            "Identifier {} for {} expires too soon to reuse",
            identifier.id, domain
        );
        return ReuseDecision::RegisterFresh;
    }

    match identifier.status {
        IdentifierStatus::Valid => {
            debug!("Reusing valid identifier {} for {}", identifier.id, domain);
            ReuseDecision::AlreadyValid(identifier.clone())
        }
        IdentifierStatus::Pending => {
            debug!("Continuing pending identifier {} for {}", identifier.id, domain);
            ReuseDecision::ContinuePending(identifier.clone())
        }
        IdentifierStatus::Unvalidated | IdentifierStatus::Invalid => ReuseDecision::RegisterFresh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn identifier(status: IdentifierStatus, expiry: Option<DateTime<Utc>>) -> DomainIdentifier {
        DomainIdentifier {
            id: "ident-1".to_string(),
            alias: "ident-1".to_string(),
            dns: "example.com".to_string(),
            status,
            authorization_expiry: expiry,
            authorization_pending: status == IdentifierStatus::Pending,
        }
    }

    #[test]
    fn test_disabled_always_registers_fresh() {
        let valid = identifier(IdentifierStatus::Valid, Some(now() + Duration::days(30)));
        let decision = resolve_reuse("example.com", Some(&valid), false, now());
        assert_eq!(decision, ReuseDecision::RegisterFresh);
    }

    #[test]
    fn test_missing_identifier_registers_fresh() {
        let decision = resolve_reuse("example.com", None, true, now());
        assert_eq!(decision, ReuseDecision::RegisterFresh);
    }

    #[test]
    fn test_valid_unexpired_is_already_valid() {
        let valid = identifier(IdentifierStatus::Valid, Some(now() + Duration::days(30)));
        let decision = resolve_reuse("example.com", Some(&valid), true, now());
        assert_eq!(decision, ReuseDecision::AlreadyValid(valid));
        assert_eq!(decision.as_str(), "already_valid");
    }

    #[test]
    fn test_pending_unexpired_continues() {
        let pending = identifier(IdentifierStatus::Pending, Some(now() + Duration::days(7)));
        let decision = resolve_reuse("example.com", Some(&pending), true, now());
        assert!(matches!(decision, ReuseDecision::ContinuePending(_)));
        assert_eq!(decision.identifier().map(|i| i.id.as_str()), Some("ident-1"));
    }

    #[test]
    fn test_expiry_exactly_one_day_out_is_not_reused() {
        for status in [IdentifierStatus::Valid, IdentifierStatus::Pending] {
            let edge = identifier(status, Some(now() + Duration::days(1)));
            assert_eq!(
                resolve_reuse("example.com", Some(&edge), true, now()),
                ReuseDecision::RegisterFresh
            );
        }
    }

    #[test]
    fn test_expiry_just_past_margin_is_reused() {
        let valid = identifier(
            IdentifierStatus::Valid,
            Some(now() + Duration::days(1) + Duration::seconds(1)),
        );
        assert!(matches!(
            resolve_reuse("example.com", Some(&valid), true, now()),
            ReuseDecision::AlreadyValid(_)
        ));
    }

    #[test]
    fn test_expired_or_unknown_expiry_is_not_reused() {
        let expired = identifier(IdentifierStatus::Valid, Some(now() - Duration::days(2)));
        assert_eq!(
            resolve_reuse("example.com", Some(&expired), true, now()),
            ReuseDecision::RegisterFresh
        );

        let no_expiry = identifier(IdentifierStatus::Valid, None);
        assert_eq!(
            resolve_reuse("example.com", Some(&no_expiry), true, now()),
            ReuseDecision::RegisterFresh
        );
    }

    #[test]
    fn test_invalid_or_unvalidated_registers_fresh() {
        for status in [IdentifierStatus::Invalid, IdentifierStatus::Unvalidated] {
            let ident = identifier(status, Some(now() + Duration::days(30)));
            assert_eq!(
                resolve_reuse("example.com", Some(&ident), true, now()),
                ReuseDecision::RegisterFresh
            );
        }
    }
}
