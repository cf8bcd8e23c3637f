//! Types exchanged with the protocol/vault client.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authorization status of a domain identifier, as known to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierStatus {
    Pending,
    Valid,
    Invalid,
    /// Registered but never validated. Unrecognized provider statuses land here.
    #[default]
    #[serde(other)]
    Unvalidated,
}

impl IdentifierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierStatus::Unvalidated => "unvalidated",
            IdentifierStatus::Pending => "pending",
            IdentifierStatus::Valid => "valid",
            IdentifierStatus::Invalid => "invalid",
        }
    }
}

/// Provider-side state for one domain name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainIdentifier {
    /// Identifier id the provider registered the domain under.
    pub id: String,
    /// Opaque handle used to complete validation and reference the identifier
    /// at issuance.
    pub alias: String,
    /// Domain name this identifier covers.
    pub dns: String,
    #[serde(default)]
    pub status: IdentifierStatus,
    /// When the current authorization stops being usable.
    #[serde(default)]
    pub authorization_expiry: Option<DateTime<Utc>>,
    /// Whether a challenge is outstanding for this identifier.
    #[serde(default)]
    pub authorization_pending: bool,
}

/// Challenge response the web server must publish for HTTP-01.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpChallengeResponse {
    pub token: String,
    pub key_authorization: String,
}

impl HttpChallengeResponse {
    /// Path of the response file relative to the site root.
    pub fn resource_path(&self) -> String {
        format!(".well-known/acme-challenge/{}", self.token)
    }
}

/// Per-domain, per-attempt authorization state.
///
/// Lives only for the duration of one certificate request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub identifier: DomainIdentifier,
    /// HTTP challenge response to publish, when the provider issued one.
    #[serde(default)]
    pub challenge: Option<HttpChallengeResponse>,
    /// Set by the binding administrator once the prerequisite configuration
    /// probe confirmed the challenge location is reachable.
    #[serde(default)]
    pub config_check_ok: bool,
}

impl PendingAuthorization {
    /// Wrap an identifier that needs no further challenge work.
    pub fn from_identifier(identifier: DomainIdentifier) -> Self {
        Self {
            identifier,
            challenge: None,
            config_check_ok: false,
        }
    }

    /// Whether a challenge is outstanding.
    pub fn is_pending(&self) -> bool {
        self.identifier.authorization_pending
    }

    /// Domain this authorization covers.
    pub fn domain(&self) -> &str {
        &self.identifier.dns
    }
}

/// Result of an issuance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuanceOutcome {
    pub success: bool,
    /// Where the issued certificate artifact was written.
    #[serde(default)]
    pub artifact_path: Option<PathBuf>,
    /// Provider error detail on failure.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl IssuanceOutcome {
    pub fn issued(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            artifact_path: Some(artifact_path.into()),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            artifact_path: None,
            error_message: Some(error_message.into()),
        }
    }
}
