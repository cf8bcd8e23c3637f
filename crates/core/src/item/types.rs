//! Managed certificate item types.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Hostname syntax accepted for primary domains and alternative names.
/// A single leading wildcard label is allowed.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*\.)?([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$")
        .unwrap()
});

/// Domain validation challenge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChallengeType {
    /// HTTP-01: response file served from the site.
    #[default]
    #[serde(rename = "http-01")]
    Http01,
    /// DNS-01: TXT record under `_acme-challenge`.
    #[serde(rename = "dns-01")]
    Dns01,
    /// TLS-ALPN-01: self-signed certificate on port 443.
    #[serde(rename = "tls-alpn-01")]
    TlsAlpn01,
}

impl ChallengeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::Http01 => "http-01",
            ChallengeType::Dns01 => "dns-01",
            ChallengeType::TlsAlpn01 => "tls-alpn-01",
        }
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a managed item's certificate is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedItemType {
    /// Bound to a local web server site; challenge responses and certificate
    /// bindings can be automated.
    #[default]
    WebServerBound,
    /// Certificate is obtained for manual deployment.
    Manual,
}

impl ManagedItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagedItemType::WebServerBound => "web_server_bound",
            ManagedItemType::Manual => "manual",
        }
    }

    /// Whether challenge responses are placed on a web server automatically.
    pub fn automates_challenge_response(&self) -> bool {
        matches!(self, ManagedItemType::WebServerBound)
    }
}

impl fmt::Display for ManagedItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificate request configuration for one managed item.
///
/// Treated as immutable for the duration of a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Primary domain, always the first entry of the effective domain set.
    pub primary_domain: String,
    /// Subject alternative names, in configured order. May repeat the primary.
    #[serde(default)]
    pub subject_alternative_names: Vec<String>,
    /// Challenge type. `None` means the standard HTTP challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_type: Option<ChallengeType>,
    /// Run the prerequisite configuration probe before submitting challenges.
    #[serde(default = "default_true")]
    pub perform_auto_config: bool,
    /// Install the issued certificate into the site bindings automatically.
    #[serde(default = "default_true")]
    pub perform_automated_cert_binding: bool,
    /// Place challenge response files on the web server automatically.
    #[serde(default = "default_true")]
    pub perform_challenge_file_copy: bool,
    /// Send notifications when a request fails.
    #[serde(default)]
    pub enable_failure_notifications: bool,
    /// Root directory the site is served from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_root_path: Option<PathBuf>,
    /// IP address of the TLS binding (`None` = all unassigned).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_ip_address: Option<String>,
    /// Port of the TLS binding (`None` = 443).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_port: Option<u16>,
}

fn default_true() -> bool {
    true
}

impl RequestConfig {
    /// Create a config for a primary domain with default policy flags.
    pub fn new(primary_domain: impl Into<String>) -> Self {
        Self {
            primary_domain: primary_domain.into(),
            subject_alternative_names: Vec::new(),
            challenge_type: None,
            perform_auto_config: true,
            perform_automated_cert_binding: true,
            perform_challenge_file_copy: true,
            enable_failure_notifications: false,
            website_root_path: None,
            binding_ip_address: None,
            binding_port: None,
        }
    }

    /// Add alternative names.
    pub fn with_alternative_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subject_alternative_names
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the website root path.
    pub fn with_website_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.website_root_path = Some(path.into());
        self
    }

    /// The challenge type to use, falling back to HTTP-01 when unset.
    pub fn effective_challenge_type(&self) -> ChallengeType {
        self.challenge_type.unwrap_or_default()
    }

    /// Distinct domain set: primary first, then alternative names in order.
    ///
    /// Names are trimmed and lowercased before comparison; empty entries are
    /// dropped.
    pub fn distinct_domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = Vec::with_capacity(1 + self.subject_alternative_names.len());
        let candidates = std::iter::once(&self.primary_domain).chain(&self.subject_alternative_names);

        for candidate in candidates {
            let normalized = candidate.trim().to_ascii_lowercase();
            if normalized.is_empty() || domains.contains(&normalized) {
                continue;
            }
            domains.push(normalized);
        }

        domains
    }

    /// Check domain syntax. Returns the first offending name.
    pub fn validate(&self) -> Result<(), String> {
        if self.primary_domain.trim().is_empty() {
            return Err("primary domain cannot be empty".to_string());
        }
        for domain in self.distinct_domains() {
            if !is_valid_domain(&domain) {
                return Err(format!("invalid domain name: {}", domain));
            }
        }
        Ok(())
    }
}

/// Whether `domain` is a syntactically valid (possibly wildcard) hostname.
pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= 253 && DOMAIN_PATTERN.is_match(&domain.to_ascii_lowercase())
}

/// A configured certificate target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedCertificateItem {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    pub item_type: ManagedItemType,
    /// Whether renewal passes pick this item up automatically.
    pub include_in_auto_renew: bool,
    pub request_config: RequestConfig,
    /// Web server site this item is bound to, used for the running check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// When a certificate was last issued for this item.
    #[serde(default)]
    pub date_issued: Option<DateTime<Utc>>,
    /// When this item was last successfully renewed.
    #[serde(default)]
    pub date_renewed: Option<DateTime<Utc>>,
    /// Current certificate not-before.
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
    /// Current certificate not-after.
    #[serde(default)]
    pub date_expiry: Option<DateTime<Utc>>,
    /// Location of the installed certificate artifact.
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
}

/// Request to create a new managed item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub item_type: ManagedItemType,
    #[serde(default = "default_true")]
    pub include_in_auto_renew: bool,
    pub request_config: RequestConfig,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl ManagedCertificateItem {
    /// Create a new item with a fresh identifier and no certificate history.
    pub fn new(request: CreateItemRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            item_type: request.item_type,
            include_in_auto_renew: request.include_in_auto_renew,
            request_config: request.request_config,
            group_id: request.group_id,
            comments: request.comments,
            date_issued: None,
            date_renewed: None,
            date_start: None,
            date_expiry: None,
            certificate_path: None,
        }
    }

    /// Primary domain of the request configuration.
    pub fn primary_domain(&self) -> &str {
        &self.request_config.primary_domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_domains_deduplicates_primary() {
        let config = RequestConfig::new("a.com").with_alternative_names(["a.com", "b.com"]);
        assert_eq!(config.distinct_domains(), vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_distinct_domains_preserves_order_primary_first() {
        let config = RequestConfig::new("www.example.com").with_alternative_names([
            "static.example.com",
            "example.com",
            "STATIC.example.com ",
            "",
        ]);
        assert_eq!(
            config.distinct_domains(),
            vec!["www.example.com", "static.example.com", "example.com"]
        );
    }

    #[test]
    fn test_effective_challenge_type_defaults_to_http() {
        let mut config = RequestConfig::new("example.com");
        assert_eq!(config.effective_challenge_type(), ChallengeType::Http01);

        config.challenge_type = Some(ChallengeType::Dns01);
        assert_eq!(config.effective_challenge_type(), ChallengeType::Dns01);
    }

    #[test]
    fn test_challenge_type_serialization() {
        let json = serde_json::to_string(&ChallengeType::TlsAlpn01).unwrap();
        assert_eq!(json, "\"tls-alpn-01\"");
        let parsed: ChallengeType = serde_json::from_str("\"http-01\"").unwrap();
        assert_eq!(parsed, ChallengeType::Http01);
    }

    #[test]
    fn test_validate_domains() {
        assert!(RequestConfig::new("example.com").validate().is_ok());
        assert!(RequestConfig::new("*.example.com").validate().is_ok());
        assert!(RequestConfig::new("").validate().is_err());
        assert!(RequestConfig::new("localhost").validate().is_err());

        let config = RequestConfig::new("example.com").with_alternative_names(["bad domain.com"]);
        assert_eq!(
            config.validate().unwrap_err(),
            "invalid domain name: bad domain.com"
        );
    }

    #[test]
    fn test_request_config_deserialize_defaults() {
        let config: RequestConfig =
            serde_json::from_str(r#"{"primary_domain": "example.com"}"#).unwrap();
        assert!(config.perform_auto_config);
        assert!(config.perform_automated_cert_binding);
        assert!(config.perform_challenge_file_copy);
        assert!(!config.enable_failure_notifications);
        assert!(config.challenge_type.is_none());
    }

    #[test]
    fn test_new_item_has_no_history() {
        let item = ManagedCertificateItem::new(CreateItemRequest {
            name: "Example".to_string(),
            item_type: ManagedItemType::Manual,
            include_in_auto_renew: true,
            request_config: RequestConfig::new("example.com"),
            group_id: None,
            comments: None,
        });
        assert!(!item.id.is_empty());
        assert!(item.date_renewed.is_none());
        assert!(item.certificate_path.is_none());
        assert_eq!(item.primary_domain(), "example.com");
    }
}
