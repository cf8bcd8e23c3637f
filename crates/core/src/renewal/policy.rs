//! Renewal policy and due-date rule.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::RenewalConfig;
use crate::item::ManagedCertificateItem;

/// Elapsed time assumed for an item that has never been renewed.
pub const NEVER_RENEWED_ELAPSED_DAYS: i64 = 30;

/// Policy for one renewal pass, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalPolicy {
    /// Only consider items flagged for auto renewal.
    pub auto_renew_only: bool,
    /// Renew items whose last renewal is older than this (0 renews everything).
    pub renewal_interval_days: u32,
    /// Query site state and skip items whose site is stopped.
    pub skip_stopped_sites: bool,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self::from(&RenewalConfig::default())
    }
}

impl From<&RenewalConfig> for RenewalPolicy {
    fn from(config: &RenewalConfig) -> Self {
        Self {
            auto_renew_only: config.auto_renew_only,
            renewal_interval_days: config.renewal_interval_days,
            skip_stopped_sites: config.skip_stopped_sites,
        }
    }
}

/// Partial override of a policy, e.g. from an API request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalPolicyOverride {
    #[serde(default)]
    pub auto_renew_only: Option<bool>,
    #[serde(default)]
    pub renewal_interval_days: Option<u32>,
    #[serde(default)]
    pub skip_stopped_sites: Option<bool>,
}

impl RenewalPolicy {
    pub fn apply(mut self, changes: RenewalPolicyOverride) -> Self {
        if let Some(v) = changes.auto_renew_only {
            self.auto_renew_only = v;
        }
        if let Some(v) = changes.renewal_interval_days {
            self.renewal_interval_days = v;
        }
        if let Some(v) = changes.skip_stopped_sites {
            self.skip_stopped_sites = v;
        }
        self
    }

    /// Whether the auto-renew filter lets this item into the pass.
    pub fn includes(&self, item: &ManagedCertificateItem) -> bool {
        !self.auto_renew_only || item.include_in_auto_renew
    }
}

/// Why a renewal pass left an item alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Last renewal is within the interval.
    CertificateStillValid,
    /// Due, but the site is stopped so validation cannot succeed.
    SiteStopped,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::CertificateStillValid => "certificate_still_valid",
            SkipReason::SiteStopped => "site_stopped",
        }
    }

    /// Progress message reported to the item's sink.
    pub fn message(&self) -> &'static str {
        match self {
            SkipReason::CertificateStillValid => "Skipping renewal, existing certificate still OK",
            SkipReason::SiteStopped => {
                "Site stopped, renewal skipped as domain validation cannot be performed"
            }
        }
    }
}

/// Whether `item` is due for renewal at `now`.
///
/// An item never renewed counts as `NEVER_RENEWED_ELAPSED_DAYS` elapsed and
/// is due unless the interval exceeds that. A last renewal in the future is
/// never due.
pub fn is_due(item: &ManagedCertificateItem, renewal_interval_days: u32, now: DateTime<Utc>) -> bool {
    let interval = Duration::days(i64::from(renewal_interval_days));

    let Some(renewed) = item.date_renewed else {
        return Duration::days(NEVER_RENEWED_ELAPSED_DAYS) >= interval;
    };

    let elapsed = now - renewed;
    if elapsed < Duration::zero() {
        warn!(
            "Item {} was last renewed in the future ({}), not renewing",
            item.name, renewed
        );
        return false;
    }
    elapsed > interval
}
