//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the real router around a
//! mock converter, so the HTTP boundary can be exercised without ffmpeg.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use reelforge_core::{
    testing::MockConverter, BatchOrchestrator, Config, DeliveryMode, StorageConfig,
    StorageManager,
};
use reelforge_server::{api::create_router, state::AppState};

/// Test fixture with a mock converter and a temporary storage root.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_convert() {
///     let fixture = TestFixture::new().await;
///     let form = MultipartForm::new().file("a.mp4", b"data").text("format", "gif");
///
///     let response = fixture.post_multipart("/api/v1/convert-batch", form).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock converter - configure failures and delays
    pub converter: Arc<MockConverter>,
    /// Storage manager shared with the orchestrator
    pub storage: StorageManager,
    /// Temporary directory for scratch, downloads and static files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture with default settings (link delivery).
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let static_dir = temp_dir.path().join("public");
        std::fs::create_dir_all(&static_dir).expect("Failed to create static dir");
        std::fs::write(
            static_dir.join("index.html"),
            "<!doctype html><title>reelforge</title>",
        )
        .expect("Failed to write index.html");

        let mut config = Config::default();
        config.server.static_dir = static_dir;
        config.server.delivery = test_config.delivery;
        config.storage = StorageConfig::with_root(temp_dir.path().join("storage"));
        if let Some(limit) = test_config.max_upload_bytes {
            config.server.max_upload_bytes = limit;
        }
        if let Some(limit) = test_config.max_file_bytes {
            config.server.max_file_bytes = limit;
        }

        let storage = StorageManager::new(config.storage.clone());
        storage
            .ensure_roots()
            .await
            .expect("Failed to create storage roots");

        let converter = Arc::new(MockConverter::new());
        let orchestrator = Arc::new(BatchOrchestrator::new(
            config.batch.clone(),
            Arc::clone(&converter) as Arc<dyn reelforge_core::Converter>,
            storage.clone(),
        ));

        let state = Arc::new(AppState::new(config, orchestrator, "mock"));
        let router = create_router(state);

        Self {
            router,
            converter,
            storage,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a multipart POST request.
    pub async fn post_multipart(&self, path: &str, form: MultipartForm) -> TestResponse {
        let (content_type, body) = form.build();
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Send a POST request with custom content type (for testing wrong content types).
    pub async fn post_with_content_type(
        &self,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
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
        let headers = response.headers().clone();
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

        TestResponse {
            status,
            headers,
            body,
            raw: body_bytes.to_vec(),
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    pub delivery: DeliveryMode,
    pub max_upload_bytes: Option<usize>,
    pub max_file_bytes: Option<usize>,
}

impl TestConfig {
    /// Create config with inline (base64) delivery.
    pub fn inline() -> Self {
        Self {
            delivery: DeliveryMode::Inline,
            ..Self::default()
        }
    }
}

/// Hand-built multipart/form-data body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    parts: Vec<(String, Option<String>, Vec<u8>)>,
}

impl MultipartForm {
    const BOUNDARY: &'static str = "reelforge-test-boundary";

    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file under the `files` field.
    pub fn file(self, file_name: &str, data: &[u8]) -> Self {
        self.field_file("files", file_name, data)
    }

    /// Add a file under an arbitrary field name.
    pub fn field_file(mut self, field: &str, file_name: &str, data: &[u8]) -> Self {
        self.parts
            .push((field.to_string(), Some(file_name.to_string()), data.to_vec()));
        self
    }

    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.parts
            .push((field.to_string(), None, value.as_bytes().to_vec()));
        self
    }

    pub fn build(self) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (field, file_name, data) in self.parts {
            body.extend_from_slice(format!("--{}\r\n", Self::BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            field, file_name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                }
                None => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field)
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(&data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());

        (
            format!("multipart/form-data; boundary={}", Self::BOUNDARY),
            body,
        )
    }
}
