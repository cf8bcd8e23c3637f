//! Error types for the protocol/vault client.

use thiserror::Error;

/// Errors returned by an `AcmeProvider`.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider did not answer within its bounded wait.
    #[error("Provider timed out")]
    Timeout,

    /// Could not reach the provider.
    #[error("Connection to provider failed: {0}")]
    ConnectionFailed(String),

    /// The provider returned an error response.
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// The provider's vault session is held by another process.
    #[error("Provider session locked: {0}")]
    SessionLocked(String),

    /// Response could not be decoded.
    #[error("Failed to parse provider response: {0}")]
    ParseError(String),
}

impl ProviderError {
    /// Whether this error is an expired bounded wait rather than a fault.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
