//! Per-domain authorization state and identifier reuse decisions.

mod state;
mod tracker;

pub use state::{DomainValidationState, FailureReason};
pub use tracker::{resolve_reuse, ReuseDecision, REUSE_EXPIRY_MARGIN_DAYS};
