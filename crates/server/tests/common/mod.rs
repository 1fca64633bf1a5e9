//! Common test utilities for API testing with mocks.
//!
//! Builds an in-process router whose provisioning handler talks to a
//! [`MockDirectory`] and [`MockTokenSource`], so the full operator flow can
//! be exercised without a tenant.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mailwright_core::{
    create_audit_system, create_provisioning_handler,
    testing::{MockDirectory, MockTokenSource},
    AuditStore, Config, NoneAuthenticator, ProvisioningOrchestrator, RecordStore,
    SqliteAuditStore, SqliteRecordStore,
};

/// Re-export fixtures for test convenience
pub use mailwright_core::testing::fixtures;

/// Test fixture for API testing with mock directory dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_personnel_creation() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/personnel", json!({
///         "display_name": "Lalith Kumar"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock directory - seed principals and groups, inspect calls
    pub directory: Arc<MockDirectory>,
    /// Mock token source - count or fail acquisitions
    pub tokens: Arc<MockTokenSource>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with complete directory credentials.
    pub async fn new() -> Self {
        Self::with_config(fixtures::config()).await
    }

    /// Create a fixture around a custom configuration.
    ///
    /// The database path is always replaced with a file in a temp dir.
    pub async fn with_config(mut config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        config.database.path = db_path.clone();

        let directory = Arc::new(MockDirectory::new());
        let tokens = Arc::new(MockTokenSource::new());

        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let records: Arc<dyn RecordStore> = Arc::new(
            SqliteRecordStore::new(&db_path).expect("Failed to create record store"),
        );

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let orchestrator = Arc::new(ProvisioningOrchestrator::new(
            config.directory.clone(),
            config.provisioning.clone(),
            Arc::clone(&tokens) as Arc<dyn mailwright_core::TokenSource>,
            Arc::clone(&directory) as Arc<dyn mailwright_core::Directory>,
            Arc::clone(&records),
            Some(audit_handle.clone()),
        ));

        let (publisher, handler) = create_provisioning_handler(Arc::clone(&orchestrator), 32);
        tokio::spawn(handler.run());

        let state = Arc::new(mailwright_server::state::AppState::new(
            config,
            Arc::new(NoneAuthenticator),
            audit_handle,
            audit_store,
            records,
            orchestrator,
            publisher,
        ));

        let router = mailwright_server::api::create_router(state);

        Self {
            router,
            directory,
            tokens,
            temp_dir,
        }
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

    /// Send a POST request naming the acting operator.
    pub async fn post_as(&self, operator: &str, path: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .header("X-Operator", operator)
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    /// Create a personnel record and return its id.
    pub async fn create_personnel(&self, display_name: &str, unit_id: Option<&str>) -> String {
        let mut body = serde_json::json!({ "display_name": display_name });
        if let Some(unit_id) = unit_id {
            body["unit_id"] = Value::String(unit_id.to_string());
        }
        let response = self.post("/api/v1/personnel", body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Create a unit and return its id.
    pub async fn create_unit(&self, name: &str) -> String {
        let response = self
            .post("/api/v1/units", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Poll a personnel record until the handler has written its mailbox.
    pub async fn wait_for_mailbox(&self, record_id: &str) -> Option<String> {
        for _ in 0..100 {
            let response = self.get(&format!("/api/v1/personnel/{}", record_id)).await;
            if let Some(mailbox) = response.body["derived_mailbox"].as_str() {
                return Some(mailbox.to_string());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    /// Poll the audit log until `event_type` appears for `record_id`.
    pub async fn wait_for_audit(&self, record_id: &str, event_type: &str) -> Option<Value> {
        for _ in 0..100 {
            let response = self
                .get(&format!(
                    "/api/v1/audit?record_id={}&event_type={}",
                    record_id, event_type
                ))
                .await;
            if let Some(event) = response.body["events"].as_array().and_then(|e| e.first()) {
                return Some(event.clone());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

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
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
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
