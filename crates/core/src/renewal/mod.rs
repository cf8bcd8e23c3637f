//! Renewal scheduling.
//!
//! - **Policy**: which items are due, given a caller-supplied `RenewalPolicy`
//! - **Scheduler**: one sequential pass over the fleet
//! - **Service**: periodic and on-demand passes on a background task

mod policy;
mod scheduler;
mod service;

pub use policy::{is_due, RenewalPolicy, RenewalPolicyOverride, SkipReason, NEVER_RENEWED_ELAPSED_DAYS};
pub use scheduler::{ProgressSinks, RenewalError, RenewalPassReport, RenewalScheduler, SkippedItem};
pub use service::{RenewalPassSummary, RenewalService, RenewalServiceStatus};
