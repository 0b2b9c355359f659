use annotate::{AnnotateConfig, Detection, FaceDetector, Pipeline};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use gateway::{AppState, DetectorHandle, detector::SharedDetector, router};
use image::{GenericImageView, Rgb, RgbImage};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

const BOUNDARY: &str = "gateway-test-boundary";
const MAX_UPLOAD: usize = 1024 * 1024;

/// Detector returning two faces and counting its calls.
struct TwoFaces {
    calls: Arc<AtomicUsize>,
}

impl FaceDetector for TwoFaces {
    fn detect(&self, _pixels: &[u8], width: u32, height: u32) -> anyhow::Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let size = (width / 4) as f32;
        Ok(vec![
            Detection::new(width as f32 / 2.0, height as f32 / 4.0, size, size, 0.9),
            Detection::new(4.0, height as f32 / 4.0, size, size, 0.8),
        ])
    }
}

struct BrokenModel;

impl FaceDetector for BrokenModel {
    fn detect(&self, _: &[u8], _: u32, _: u32) -> anyhow::Result<Vec<Detection>> {
        anyhow::bail!("output tensor missing")
    }
}

fn app_with(detector: DetectorHandle, max_upload_bytes: usize) -> Router {
    let pipeline = Pipeline::new(AnnotateConfig::default()).unwrap();
    router(AppState::new(pipeline, detector, max_upload_bytes))
}

fn counting_app() -> (Router, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector = TwoFaces {
        calls: Arc::clone(&calls),
    };
    (
        app_with(DetectorHandle::ready(Arc::new(detector)), MAX_UPLOAD),
        calls,
    )
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 3) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
    });
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// (field name, file name, content)
fn multipart_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => {
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
            }
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn health(app: Router) -> Value {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    send(app, request).await.1
}

#[tokio::test]
async fn test_index_serves_upload_page() {
    let (app, _) = counting_app();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<form"));
    assert!(html.contains("name=\"file\""));
}

#[tokio::test]
async fn test_successful_upload_returns_count_and_jpeg() {
    let (app, calls) = counting_app();
    let png = png_bytes(80, 60);

    let (status, body) = send(app, multipart_request(&[("file", Some("faces.png"), png.as_slice())])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let jpeg = STANDARD.decode(body["image"].as_str().unwrap()).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "payload should be a JPEG");
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!(decoded.dimensions(), (80, 60));
}

#[tokio::test]
async fn test_missing_file_part() {
    let (app, calls) = counting_app();

    let (status, body) =
        send(app, multipart_request(&[("caption", None, b"holiday".as_slice())])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_multipart_body_has_no_file_part() {
    let (app, calls) = counting_app();
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_file_name_or_content() {
    let png = png_bytes(8, 8);

    for parts in [
        vec![("file", Some(""), png.as_slice())],
        vec![("file", Some("empty.png"), b"".as_slice())],
    ] {
        let (app, calls) = counting_app();
        let (status, body) = send(app, multipart_request(&parts)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No selected file");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_non_image_upload_is_unprocessable() {
    let (app, calls) = counting_app();

    let (status, body) = send(
        app,
        multipart_request(&[("file", Some("notes.txt"), b"just some text".as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("decode"), "unexpected error: {message}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_detector_failure_is_unprocessable() {
    let app = app_with(DetectorHandle::ready(Arc::new(BrokenModel)), MAX_UPLOAD);
    let png = png_bytes(16, 16);

    let (status, body) = send(app, multipart_request(&[("file", Some("a.png"), png.as_slice())])).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("output tensor missing"));
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let (calls, app) = {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = TwoFaces {
            calls: Arc::clone(&calls),
        };
        (calls, app_with(DetectorHandle::ready(Arc::new(detector)), 512))
    };
    let big = vec![0u8; 4096];

    let (status, body) = send(app, multipart_request(&[("file", Some("big.png"), big.as_slice())])).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lazy_detector_loads_on_first_valid_upload() {
    let loads = Arc::new(AtomicUsize::new(0));
    let detections = Arc::new(AtomicUsize::new(0));
    let handle = {
        let loads = Arc::clone(&loads);
        let detections = Arc::clone(&detections);
        DetectorHandle::new(move || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(TwoFaces {
                calls: Arc::clone(&detections),
            }) as SharedDetector)
        })
    };
    let app = app_with(handle, MAX_UPLOAD);

    assert_eq!(health(app.clone()).await["detector_loaded"], false);

    // Rejected requests never touch the model
    let (status, _) = send(app.clone(), multipart_request(&[("other", None, b"x".as_slice())])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    let png = png_bytes(32, 32);
    for _ in 0..2 {
        let (status, body) =
            send(app.clone(), multipart_request(&[("file", Some("a.png"), png.as_slice())])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(detections.load(Ordering::SeqCst), 2);

    let health = health(app).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["detector_loaded"], true);
}

#[tokio::test]
async fn test_failed_lazy_load_reports_error_and_retries() {
    let loads = Arc::new(AtomicUsize::new(0));
    let handle = {
        let loads = Arc::clone(&loads);
        DetectorHandle::new(move || {
            loads.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("model file not found")
        })
    };
    let app = app_with(handle, MAX_UPLOAD);
    let png = png_bytes(16, 16);

    for attempt in 1..=2 {
        let (status, body) =
            send(app.clone(), multipart_request(&[("file", Some("a.png"), png.as_slice())])).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("model file not found"));
        assert_eq!(loads.load(Ordering::SeqCst), attempt);
    }

    assert_eq!(health(app).await["detector_loaded"], false);
}
