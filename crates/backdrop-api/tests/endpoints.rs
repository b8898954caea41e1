//! Router-level tests with stubbed model adapters.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use backdrop_api::{create_router, ApiConfig, AppState};
use backdrop_media::encode_png;
use backdrop_ml_client::{BackgroundRemover, MlError, MlResult, StyleTransfer};
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "backdrop-test-boundary";

struct StubRemover {
    cutout: Vec<u8>,
    calls: AtomicUsize,
}

#[async_trait]
impl BackgroundRemover for StubRemover {
    async fn remove_background(&self, _image: Vec<u8>) -> MlResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cutout.clone())
    }
}

struct FailingRemover;

#[async_trait]
impl BackgroundRemover for FailingRemover {
    async fn remove_background(&self, _image: Vec<u8>) -> MlResult<Vec<u8>> {
        Err(MlError::InvalidResponse("empty body".to_string()))
    }
}

struct StubStylist {
    output: Option<Vec<u8>>,
    configured: bool,
}

#[async_trait]
impl StyleTransfer for StubStylist {
    async fn style_transfer(&self, _image: Vec<u8>, _prompt: &str) -> Option<Vec<u8>> {
        self.output.clone()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    encode_png(&image).unwrap()
}

fn test_config(dir: &Path) -> ApiConfig {
    ApiConfig {
        output_dir: dir.join("videos"),
        background_path: dir.join("forest.jpg"),
        logo_bottom_left: dir.join("missing-left.png"),
        logo_top_right: dir.join("missing-right.png"),
        metrics_enabled: false,
        ..ApiConfig::default()
    }
}

fn router(config: ApiConfig, remover: Arc<dyn BackgroundRemover>, stylist: StubStylist) -> Router {
    let state = AppState::with_adapters(config, remover, Arc::new(stylist));
    create_router(state, None)
}

fn stub_remover() -> Arc<StubRemover> {
    Arc::new(StubRemover {
        cutout: png(8, 6, [0, 255, 0, 255]),
        calls: AtomicUsize::new(0),
    })
}

fn no_style() -> StubStylist {
    StubStylist {
        output: None,
        configured: false,
    }
}

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"photo.png\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, bytes)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_file_is_rejected_on_every_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = router(test_config(dir.path()), stub_remover(), no_style());

    for uri in [
        "/api/remove-background/",
        "/api/remove-background2/",
        "/api/jurassic-explorer/",
    ] {
        let response = app
            .clone()
            .oneshot(upload_request(uri, "image", &png(4, 4, [0, 0, 0, 255])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json_body(response).await["error"], "No file was provided");
    }
}

#[tokio::test]
async fn test_non_multipart_body_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = router(test_config(dir.path()), stub_remover(), no_style());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/remove-background")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file was provided");
}

#[tokio::test]
async fn test_empty_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let remover = stub_remover();
    let app = router(test_config(dir.path()), remover.clone(), no_style());

    let response = app
        .oneshot(upload_request("/api/remove-background/", "file", b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(remover.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let dir = TempDir::new().unwrap();
    let config = ApiConfig {
        max_body_size: 256,
        ..test_config(dir.path())
    };
    let remover = stub_remover();
    let app = router(config, remover.clone(), no_style());

    let response = app
        .oneshot(upload_request(
            "/api/remove-background2/",
            "file",
            &vec![7u8; 8 * 1024],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error"], "Uploaded file is too large");
    assert_eq!(remover.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remove_background_returns_png_attachment() {
    let dir = TempDir::new().unwrap();
    let remover = stub_remover();
    let app = router(test_config(dir.path()), remover.clone(), no_style());

    let response = app
        .oneshot(upload_request(
            "/api/remove-background/",
            "file",
            &png(8, 6, [10, 20, 30, 255]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"no-bg.png\""
    );
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), remover.cutout.as_slice());
    assert_eq!(remover.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remover_failure_is_server_error() {
    let dir = TempDir::new().unwrap();
    let app = router(test_config(dir.path()), Arc::new(FailingRemover), no_style());

    let response = app
        .oneshot(upload_request(
            "/api/remove-background",
            "file",
            &png(4, 4, [0, 0, 0, 255]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Error processing image"));
}

#[tokio::test]
async fn test_missing_background_reports_path() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let expected = config.background_path.display().to_string();
    let app = router(config, stub_remover(), no_style());

    let response = app
        .oneshot(upload_request(
            "/api/remove-background2/",
            "file",
            &png(8, 6, [10, 20, 30, 255]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains(&expected), "{message}");
}

#[tokio::test]
async fn test_style_failure_is_server_error() {
    let dir = TempDir::new().unwrap();
    let app = router(test_config(dir.path()), stub_remover(), no_style());

    let response = app
        .oneshot(upload_request(
            "/api/jurassic-explorer/",
            "file",
            &png(8, 6, [10, 20, 30, 255]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "Could not generate the Jurassic explorer image"
    );
}

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let dir = TempDir::new().unwrap();
    let config = ApiConfig {
        rate_limit_rps: 2,
        ..test_config(dir.path())
    };
    let app = router(config, stub_remover(), no_style());

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let mut request = upload_request("/api/remove-background/", "image", b"x");
        request
            .headers_mut()
            .insert("x-forwarded-for", "192.168.1.100".parse().unwrap());
        statuses.push(app.clone().oneshot(request).await.unwrap().status());
    }

    assert_eq!(
        statuses,
        [
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn test_health_endpoints() {
    let dir = TempDir::new().unwrap();
    let app = router(test_config(dir.path()), stub_remover(), no_style());

    for uri in ["/health", "/healthz"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }
}

#[tokio::test]
async fn test_ready_is_degraded_without_assets() {
    let dir = TempDir::new().unwrap();
    let app = router(test_config(dir.path()), stub_remover(), no_style());

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["background"]["status"], "error");
    assert_eq!(body["checks"]["style_transfer"]["status"], "error");
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let dir = TempDir::new().unwrap();
    let app = router(test_config(dir.path()), stub_remover(), no_style());

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn assert_data_url(value: &Value, mime: &str) {
    let url = value.as_str().unwrap();
    assert!(url.starts_with(&format!("data:{mime};base64,")), "{url:.40}");
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_remove_background2_returns_transition() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let background = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        32,
        24,
        Rgba([0, 0, 255, 255]),
    ));
    background.to_rgb8().save(&config.background_path).unwrap();
    let output_dir = config.output_dir.clone();
    let app = router(config, stub_remover(), no_style());

    let response = app
        .oneshot(upload_request(
            "/api/remove-background2/",
            "file",
            &png(16, 12, [255, 0, 0, 255]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_data_url(&body["image_no_bg"], "image/png");
    assert_data_url(&body["image_with_new_bg"], "image/png");
    assert_data_url(&body["transition_video"], "video/mp4");

    let videos: Vec<_> = std::fs::read_dir(&output_dir).unwrap().collect();
    assert_eq!(videos.len(), 1);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_jurassic_explorer_returns_transition() {
    let dir = TempDir::new().unwrap();
    let stylist = StubStylist {
        output: Some(png(16, 12, [200, 150, 0, 255])),
        configured: true,
    };
    let app = router(test_config(dir.path()), stub_remover(), stylist);

    let response = app
        .oneshot(upload_request(
            "/api/jurassic-explorer/",
            "file",
            &png(16, 12, [255, 0, 0, 255]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_data_url(&body["image_no_bg"], "image/png");
    assert_data_url(&body["image_with_new_bg"], "image/png");
    assert_data_url(&body["transition_video"], "video/mp4");
}
