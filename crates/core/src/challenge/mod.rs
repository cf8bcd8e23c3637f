//! Drives one domain through challenge preparation, submission and completion.

mod coordinator;

pub use coordinator::{ChallengeCoordinator, CoordinatorError, DomainValidation};
