//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock collaborators injected, enabling API tests without a vault
//! sidecar or a web server.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use certward_core::{
    create_audit_system,
    testing::{MockAcmeProvider, MockBindingAdmin, MockCertificateStore},
    AcmeConfig, AcmeProvider, AuditStore, BindingAdmin, CertificateRequester, CertificateStore,
    Config, DatabaseConfig, ManagedItemStore, RenewalConfig, RenewalPolicy, RenewalScheduler,
    RenewalService, ServerConfig, SqliteAuditStore, SqliteItemStore, VaultConfig, WebrootConfig,
};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use certward_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process router with fully controllable mocks for:
/// - The ACME provider (MockAcmeProvider)
/// - The web server binding admin (MockBindingAdmin)
/// - Certificate file reads (MockCertificateStore)
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock provider - reject validations, fail issuance
    pub provider: Arc<MockAcmeProvider>,
    /// Mock binding admin - site states, install results
    pub binding: Arc<MockBindingAdmin>,
    /// Mock certificate store - certificate dates
    pub cert_store: Arc<MockCertificateStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        // Create mocks
        let provider = Arc::new(MockAcmeProvider::new());
        let binding = Arc::new(MockBindingAdmin::new());
        let cert_store = Arc::new(MockCertificateStore::new());

        // Create config
        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            renewal: RenewalConfig::default(),
            acme: AcmeConfig::default(),
            vault: VaultConfig {
                url: "http://127.0.0.1:9400".to_string(),
                api_key: Some("secret-vault-key".to_string()),
                timeout_secs: 30,
                validation_timeout_secs: 120,
            },
            webroot: WebrootConfig::default(),
        };

        // Create stores
        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let items: Arc<dyn ManagedItemStore> =
            Arc::new(SqliteItemStore::new(&db_path).expect("Failed to create item store"));

        // Create audit system
        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);

        // Spawn audit writer
        tokio::spawn(audit_writer.run());

        // Engine wired to the mocks
        let requester = Arc::new(
            CertificateRequester::new(
                Arc::clone(&provider) as Arc<dyn AcmeProvider>,
                Arc::clone(&binding) as Arc<dyn BindingAdmin>,
                Arc::clone(&cert_store) as Arc<dyn CertificateStore>,
                Arc::clone(&items),
            )
            .with_audit(audit_handle.clone()),
        );
        let scheduler = Arc::new(
            RenewalScheduler::new(
                Arc::clone(&requester),
                Arc::clone(&binding) as Arc<dyn BindingAdmin>,
                Arc::clone(&items),
            )
            .with_audit(audit_handle.clone()),
        );
        // Background loop stays stopped; passes run through the API.
        let renewal = Arc::new(RenewalService::new(
            scheduler,
            RenewalPolicy::from(&config.renewal),
            Duration::from_secs(config.renewal.check_interval_secs),
        ));

        // Create app state with mocks
        let state = Arc::new(certward_server::state::AppState::new(
            config,
            audit_handle,
            audit_store,
            items,
            requester,
            renewal,
        ));

        // Create router
        let router = certward_server::api::create_router(state);

        Self {
            router,
            provider,
            binding,
            cert_store,
            temp_dir,
        }
    }

    /// Create a web server bound item through the API and return its id.
    pub async fn create_web_item(&self, name: &str, primary: &str, alternatives: &[&str]) -> String {
        let response = self
            .post(
                "/api/v1/items",
                json!({
                    "name": name,
                    "item_type": "web_server_bound",
                    "group_id": format!("site-{}", primary),
                    "request_config": {
                        "primary_domain": primary,
                        "subject_alternative_names": alternatives,
                        "website_root_path": format!("/var/www/{}", primary)
                    }
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"]
            .as_str()
            .expect("created item has an id")
            .to_string()
    }

    /// Poll the audit endpoint until at least `min` events match `query`.
    ///
    /// Audit events are written by a background task, so they show up
    /// shortly after the request that produced them.
    pub async fn wait_for_audit(&self, query: &str, min: usize) -> Vec<Value> {
        for _ in 0..50 {
            let response = self.get(&format!("/api/v1/audit?{}", query)).await;
            let events = response.body["events"].as_array().cloned().unwrap_or_default();
            if events.len() >= min {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Timed out waiting for {} audit events matching {}", min, query);
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request_raw("POST", path, body, "application/json").await
    }

    /// Send a request with raw string body and custom content type.
    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
