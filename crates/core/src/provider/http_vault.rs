//! Vault sidecar client over HTTP.
//!
//! Talks to a vault service that owns the ACME account, identifiers and
//! issued artifacts, and exposes each vault operation as a JSON endpoint
//! under `/api/v1`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::VaultConfig;
use crate::item::{ChallengeType, RequestConfig};

use super::{AcmeProvider, DomainIdentifier, IssuanceOutcome, PendingAuthorization, ProviderError};

#[derive(Debug, Serialize)]
struct AuthorizationRequest<'a> {
    domain: &'a str,
    challenge_type: ChallengeType,
    perform_challenge_file_copy: bool,
}

#[derive(Debug, Serialize)]
struct ChallengeRequest {
    challenge_type: ChallengeType,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    validated: bool,
}

#[derive(Debug, Serialize)]
struct IssuanceRequest<'a> {
    primary_domain: &'a str,
    alternative_domains: &'a [String],
}

/// `AcmeProvider` backed by a vault sidecar.
pub struct HttpVaultClient {
    client: Client,
    config: VaultConfig,
}

impl HttpVaultClient {
    /// Create a new vault client.
    ///
    /// The HTTP timeout covers the validation wait plus the regular request
    /// timeout, since completion blocks server-side.
    pub fn new(config: VaultConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs + config.validation_timeout_secs,
            ))
            .build()
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url(), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else if e.is_connect() {
                ProviderError::ConnectionFailed(e.to_string())
            } else {
                ProviderError::ApiError(e.to_string())
            }
        })?;

        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = body.chars().take(200).collect::<String>();
        match status {
            StatusCode::LOCKED | StatusCode::CONFLICT => Err(ProviderError::SessionLocked(detail)),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Err(ProviderError::Timeout),
            _ => Err(ProviderError::ApiError(format!("HTTP {}: {}", status, detail))),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::ApiError(e.to_string())
            }
        })?;
        serde_json::from_str(&body).map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl AcmeProvider for HttpVaultClient {
    fn name(&self) -> &str {
        "http-vault"
    }

    fn compute_identifier_id(&self, domain: &str) -> String {
        identifier_id_for(domain)
    }

    async fn get_domain_identifier(
        &self,
        domain: &str,
    ) -> Result<Option<DomainIdentifier>, ProviderError> {
        let url = self.endpoint(&format!("/identifiers/{}", urlencoding::encode(domain)));
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::ConnectionFailed(e.to_string())
                }
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Vault has no identifier for {}", domain);
            return Ok(None);
        }

        let response = Self::check_status(response).await?;
        Self::decode(response).await.map(Some)
    }

    async fn begin_registration_and_validation(
        &self,
        config: &RequestConfig,
        identifier_id: &str,
        challenge_type: ChallengeType,
        domain: &str,
    ) -> Result<PendingAuthorization, ProviderError> {
        let url = self.endpoint(&format!(
            "/identifiers/{}/authorizations",
            urlencoding::encode(identifier_id)
        ));
        let body = AuthorizationRequest {
            domain,
            challenge_type,
            perform_challenge_file_copy: config.perform_challenge_file_copy,
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        Self::decode(response).await
    }

    async fn submit_challenge(
        &self,
        identifier_id: &str,
        challenge_type: ChallengeType,
    ) -> Result<(), ProviderError> {
        let url = self.endpoint(&format!(
            "/identifiers/{}/challenges",
            urlencoding::encode(identifier_id)
        ));
        self.send(self.client.post(&url).json(&ChallengeRequest { challenge_type }))
            .await?;
        Ok(())
    }

    async fn complete_identifier_validation(
        &self,
        identifier_alias: &str,
    ) -> Result<bool, ProviderError> {
        let url = self.endpoint(&format!(
            "/identifiers/{}/completion",
            urlencoding::encode(identifier_alias)
        ));
        let body = CompletionRequest {
            timeout_secs: self.config.validation_timeout_secs,
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let completion: CompletionResponse = Self::decode(response).await?;
        if !completion.validated {
            warn!("Vault reports identifier {} failed validation", identifier_alias);
        }
        Ok(completion.validated)
    }

    async fn request_issuance(
        &self,
        primary_domain: &str,
        alternative_domains: &[String],
    ) -> Result<IssuanceOutcome, ProviderError> {
        let url = self.endpoint("/certificates");
        let body = IssuanceRequest {
            primary_domain,
            alternative_domains,
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        Self::decode(response).await
    }
}

/// Deterministic identifier id for a domain.
pub(crate) fn identifier_id_for(domain: &str) -> String {
    let digest = Sha256::digest(domain.trim().to_ascii_lowercase().as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("ident{}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> HttpVaultClient {
        HttpVaultClient::new(VaultConfig {
            url: url.to_string(),
            api_key: None,
            timeout_secs: 5,
            validation_timeout_secs: 60,
        })
        .unwrap()
    }

    #[test]
    fn test_identifier_id_is_stable_and_case_insensitive() {
        let a = identifier_id_for("Example.com");
        let b = identifier_id_for("example.com ");
        assert_eq!(a, b);
        assert!(a.starts_with("ident"));
        assert_eq!(a.len(), "ident".len() + 16);
        assert_ne!(a, identifier_id_for("www.example.com"));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let vault = client("http://localhost:9400/");
        assert_eq!(
            vault.endpoint("/certificates"),
            "http://localhost:9400/api/v1/certificates"
        );
    }

    #[test]
    fn test_issuance_request_serialization() {
        let alts = vec!["www.example.com".to_string()];
        let body = IssuanceRequest {
            primary_domain: "example.com",
            alternative_domains: &alts,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["primary_domain"], "example.com");
        assert_eq!(json["alternative_domains"][0], "www.example.com");
    }

    #[test]
    fn test_authorization_request_serialization() {
        let body = AuthorizationRequest {
            domain: "example.com",
            challenge_type: ChallengeType::Http01,
            perform_challenge_file_copy: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["challenge_type"], "http-01");
    }

    #[tokio::test]
    async fn test_unreachable_vault_is_connection_error() {
        // Port 9 (discard) is not expected to be listening.
        let vault = client("http://127.0.0.1:9");
        let result = vault.get_domain_identifier("example.com").await;
        assert!(matches!(
            result,
            Err(ProviderError::ConnectionFailed(_)) | Err(ProviderError::Timeout)
        ));
    }
}
