//! Protocol/vault client seam.
//!
//! The `AcmeProvider` trait is everything the renewal engine needs from the
//! certificate authority side: identifier lookup, registration and
//! authorization, challenge submission, validation completion, and
//! issuance. The engine never speaks the ACME wire protocol itself.

mod error;
mod http_vault;
mod traits;
mod types;

pub use error::ProviderError;
pub use http_vault::HttpVaultClient;
pub use traits::AcmeProvider;
pub use types::{
    DomainIdentifier, HttpChallengeResponse, IdentifierStatus, IssuanceOutcome,
    PendingAuthorization,
};
