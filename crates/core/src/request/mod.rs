//! Certificate request orchestration.
//!
//! Drives one managed item through domain validation, issuance,
//! installation and persistence, producing exactly one result.

mod progress;
mod requester;
mod types;

pub(crate) use progress::emit;
pub use progress::{progress_fn, FnProgressSink, ProgressSink, RequestProgressState, RequestState};
pub use requester::CertificateRequester;
pub use types::{CertificateRequestResult, DomainValidationReport, RequestError, RequestFailureKind};
