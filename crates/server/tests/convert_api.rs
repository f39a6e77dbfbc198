//! Batch conversion API tests against an in-process router.

mod common;

use axum::http::{header, StatusCode};
use common::{MultipartForm, TestConfig, TestFixture};
use reelforge_core::{testing::MockConverter, ErrorKind};

fn three_files() -> MultipartForm {
    MultipartForm::new()
        .file("a.mp4", b"first video")
        .file("b.mov", b"second video")
        .file("c.mp4", b"third video")
        .text("format", "gif")
        .text("quality", "80")
        .text("scale", "50")
}

#[tokio::test]
async fn test_health_endpoints() {
    let fixture = TestFixture::new().await;

    for path in ["/api/v1/health", "/health"] {
        let response = fixture.get(path).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "ok");
    }
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(response.headers[header::X_XSS_PROTECTION], "1; mode=block");
}

#[tokio::test]
async fn test_batch_with_partial_failure() {
    let fixture = TestFixture::new().await;
    fixture
        .converter
        .fail_for("c.mp4", ErrorKind::EngineError)
        .await;

    let response = fixture
        .post_multipart("/api/v1/convert-batch", three_files())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], false);

    let results = response.body["results"].as_array().unwrap();
    let errors = response.body["errors"].as_array().unwrap();
    assert_eq!(results.len() + errors.len(), 3);
    assert_eq!(results[0]["name"], "a.gif");
    assert_eq!(results[1]["name"], "b.gif");
    assert_eq!(
        results[0]["sizeBytes"],
        MockConverter::OUTPUT.len() as u64
    );
    assert_eq!(errors[0]["name"], "c.mp4");
    assert_eq!(errors[0]["kind"], "engine_error");
    assert!(errors[0]["error"].as_str().unwrap().contains("FFmpeg failed"));

    let recorded = fixture.converter.recorded_conversions().await;
    assert_eq!(recorded.len(), 3);
    assert!(recorded
        .iter()
        .all(|c| c.format == "gif" && c.quality == 80 && c.scale_percent == 50));
    assert_eq!(fixture.storage.active_count(), 0);
}

#[tokio::test]
async fn test_download_link_serves_output() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new().file("clip.mp4", b"video"),
        )
        .await;

    assert_eq!(response.body["success"], true);
    let url = response.body["results"][0]["downloadUrl"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(url.starts_with("/downloads/"));
    assert!(url.ends_with("clip.gif"));
    assert!(response.body["results"][0].get("data").is_none());

    let download = fixture.get(&url).await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.raw, MockConverter::OUTPUT);
}

#[tokio::test]
async fn test_inline_delivery() {
    let fixture = TestFixture::with_config(TestConfig::inline()).await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new()
                .file("clip.mov", b"video")
                .text("format", "webm"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let result = &response.body["results"][0];
    assert_eq!(result["name"], "clip.webm");
    assert!(result["data"]
        .as_str()
        .unwrap()
        .starts_with("data:video/webm;base64,"));
    assert!(result.get("downloadUrl").is_none());
}

#[tokio::test]
async fn test_eleven_files_rejected_without_conversion() {
    let fixture = TestFixture::new().await;
    let mut form = MultipartForm::new();
    for i in 0..11 {
        form = form.file(&format!("clip{}.mp4", i), b"video");
    }

    let response = fixture.post_multipart("/api/v1/convert-batch", form).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("Too many files"));
    assert_eq!(fixture.converter.conversion_count().await, 0);
}

#[tokio::test]
async fn test_ten_files_accepted() {
    let fixture = TestFixture::new().await;
    let mut form = MultipartForm::new();
    for i in 0..10 {
        form = form.file(&format!("clip{}.mp4", i), b"video");
    }

    let response = fixture.post_multipart("/api/v1/convert-batch", form).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["results"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_no_files_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new().text("format", "gif"),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "batch contains no jobs");
}

#[tokio::test]
async fn test_unparseable_quality_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new()
                .file("a.mp4", b"video")
                .text("quality", "high"),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].as_str().unwrap().contains("quality"));
    assert_eq!(fixture.converter.conversion_count().await, 0);
}

#[tokio::test]
async fn test_unsupported_format_reported_per_file() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new()
                .file("a.mp4", b"video")
                .file("b.mp4", b"video")
                .text("format", "bmp"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], false);
    let errors = response.body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e["kind"] == "unsupported_format"));
    assert_eq!(fixture.converter.conversion_count().await, 0);
}

#[tokio::test]
async fn test_defaults_and_any_file_field() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/convert-batch",
            MultipartForm::new().field_file("video", "holiday.mov", b"video"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["results"][0]["name"], "holiday.gif");

    let recorded = fixture.converter.recorded_conversions().await;
    assert_eq!(recorded[0].format, "gif");
    assert_eq!(recorded[0].quality, 80);
    assert_eq!(recorded[0].scale_percent, 100);
}

#[tokio::test]
async fn test_traversal_names_are_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new().file("../../etc/passwd.mp4", b"video"),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["results"][0]["name"], "passwd.gif");
    let url = response.body["results"][0]["downloadUrl"].as_str().unwrap();
    assert!(!url.contains(".."));
}

#[tokio::test]
async fn test_wrong_content_type_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_with_content_type("/api/v1/convert-batch", "{}", "application/json")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_limit_enforced() {
    let fixture = TestFixture::with_config(TestConfig {
        max_upload_bytes: Some(1024),
        ..TestConfig::default()
    })
    .await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new().file("big.mp4", &vec![7u8; 8 * 1024]),
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(fixture.converter.conversion_count().await, 0);
}

#[tokio::test]
async fn test_oversized_file_rejected() {
    let fixture = TestFixture::with_config(TestConfig {
        max_file_bytes: Some(1024),
        ..TestConfig::default()
    })
    .await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new()
                .file("small.mp4", &[1u8; 512])
                .file("huge.mp4", &vec![7u8; 4 * 1024]),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let message = response.body["error"].as_str().unwrap();
    assert!(message.contains("File too large"));
    assert!(message.contains("huge.mp4"));
    assert_eq!(fixture.converter.conversion_count().await, 0);
}

#[tokio::test]
async fn test_file_at_size_limit_accepted() {
    let fixture = TestFixture::with_config(TestConfig {
        max_file_bytes: Some(1024),
        ..TestConfig::default()
    })
    .await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new().file("exact.mp4", &[1u8; 1024]),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let recorded = fixture.converter.recorded_conversions().await;
    assert_eq!(recorded[0].input_bytes, 1024);
}

#[tokio::test]
async fn test_out_of_range_quality_reaches_converter() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/api/v1/convert-batch",
            MultipartForm::new()
                .file("a.mp4", b"video")
                .text("quality", "300"),
        )
        .await;

    // Range is judged per file, not by rejecting the request
    assert_eq!(response.status, StatusCode::OK);
    let recorded = fixture.converter.recorded_conversions().await;
    assert_eq!(recorded[0].quality, u8::MAX);
}

#[tokio::test]
async fn test_status_endpoint() {
    let fixture = TestFixture::new().await;
    fixture
        .post_multipart("/api/v1/convert-batch", three_files())
        .await;

    let response = fixture.get("/api/v1/status").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["converter"], "mock");
    assert_eq!(response.body["max_files"], 10);
    assert_eq!(response.body["pool"]["max_concurrent"], 2);
    assert_eq!(response.body["pool"]["total_processed"], 3);
    assert_eq!(response.body["pool"]["active_jobs"], 0);
}

#[tokio::test]
async fn test_config_endpoint_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["server"]["delivery"], "link");
    assert_eq!(response.body["batch"]["max_files"], 10);
    assert!(response.body.get("storage").is_none());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture
        .post_multipart("/api/v1/convert-batch", three_files())
        .await;

    let response = fixture.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    let text = String::from_utf8(response.raw).unwrap();
    assert!(text.contains("reelforge_jobs_total"));
    assert!(text.contains("reelforge_http_requests_total"));
    assert!(text.contains("reelforge_conversion_pool_active"));
}

#[tokio::test]
async fn test_static_ui_fallback() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    let html = String::from_utf8(response.raw).unwrap();
    assert!(html.contains("<title>reelforge</title>"));
}
