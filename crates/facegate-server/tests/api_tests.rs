//! Integration tests for the facegate-server HTTP surface

use std::fs;
use std::io::Cursor;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use facegate_face_core::faces::{
    encode_image_payload, FaceService, FilesystemFingerprintStore, FingerprintStore,
    InMemoryFingerprintStore, MatchSettings,
};
use facegate_server::{build_router, AppState};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const ORIGIN: &str = "http://localhost:3000";

fn memory_app(threshold: f64) -> Router {
    let store: Box<dyn FingerprintStore> = Box::new(InMemoryFingerprintStore::new());
    let service = FaceService::new(MatchSettings::new(threshold, 8).unwrap(), store);
    build_router(AppState::new(service, vec![ORIGIN.to_string()]))
}

fn face_payload(offset: u8) -> String {
    let image = GrayImage::from_fn(16, 16, |x, y| Luma([offset.wrapping_add((x * 9 + y) as u8)]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", encode_image_payload(&cursor.into_inner()))
}

/// Camera-sized noisy photo; noise keeps PNG from compressing it below axum's 2 MiB default.
fn large_photo_payload(width: u32, height: u32) -> String {
    let mut state: u32 = 0x2545_f491;
    let image = RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgb([channel(), channel(), channel()])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", encode_image_payload(&cursor.into_inner()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    (status, serde_json::from_slice(&bytes).expect("Should parse JSON"))
}

#[tokio::test]
async fn root_reports_service_identity() {
    let app = memory_app(25.0);
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "Face Recognition Service");
    assert_eq!(body["status"], "running");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn liveness_and_readiness_endpoints() {
    let app = memory_app(25.0);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "model_loaded": true}));

    let (status, body) = send(&app, get("/api/face/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "db_connected": true}));
}

#[tokio::test]
async fn readiness_degrades_when_store_directory_disappears() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("fingerprints");
    let store: Box<dyn FingerprintStore> = Box::new(FilesystemFingerprintStore::open(&dir).unwrap());
    let service = FaceService::new(MatchSettings::new(25.0, 8).unwrap(), store);
    let app = build_router(AppState::new(service, vec![]));

    fs::remove_dir_all(&dir).unwrap();
    let (status, body) = send(&app, get("/api/face/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "degraded", "db_connected": false}));
}

#[tokio::test]
async fn enroll_then_verify_matches() {
    let app = memory_app(25.0);
    let request = json!({"userId": "u1", "imageBase64": face_payload(0)});

    let (status, enrolled) = send(&app, post_json("/api/face/enroll", request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(enrolled["success"], true);
    assert_eq!(enrolled["message"], "Face enrolled successfully");
    let embedding_id = enrolled["embeddingId"].as_str().unwrap().to_string();

    let (_, again) = send(&app, post_json("/api/face/enroll", request.clone())).await;
    assert_eq!(again["embeddingId"], embedding_id.as_str());

    let (status, verified) = send(&app, post_json("/api/face/verify", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["match"], true);
    assert_eq!(verified["autoEnrolled"], false);
    assert_eq!(verified["confidence"], 1.0);
    assert_eq!(
        verified["message"],
        "Face verified successfully (distance: 0.0000, confidence: 1.00)"
    );
}

#[tokio::test]
async fn first_verify_auto_enrolls_then_rejects_a_different_face() {
    let app = memory_app(0.5);

    let first = json!({"userId": "u2", "imageBase64": face_payload(0)});
    let (status, body) = send(&app, post_json("/api/face/verify", first)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "match": true,
            "confidence": 1.0,
            "autoEnrolled": true,
            "message": "First face enrolled and verified for this user.",
        })
    );

    let other = json!({"userId": "u2", "imageBase64": face_payload(128)});
    let (status, body) = send(&app, post_json("/api/face/verify", other)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["match"], false);
    assert_eq!(body["autoEnrolled"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Face does not match stored embedding"));
}

#[tokio::test]
async fn bad_payload_is_a_client_error_and_stores_nothing() {
    let app = memory_app(25.0);

    let bad = json!({"userId": "u3", "imageBase64": "data:image/png;base64,%%%"});
    let (status, body) = send(&app, post_json("/api/face/verify", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("base64"));

    let good = json!({"userId": "u3", "imageBase64": face_payload(5)});
    let (_, body) = send(&app, post_json("/api/face/verify", good)).await;
    assert_eq!(body["autoEnrolled"], true);
}

#[tokio::test]
async fn large_photo_uploads_are_accepted() {
    let app = memory_app(25.0);
    let request = json!({"userId": "u6", "imageBase64": large_photo_payload(1200, 1000)});
    assert!(request.to_string().len() > 2 * 1024 * 1024);

    let (status, body) = send(&app, post_json("/api/face/verify", request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autoEnrolled"], true);

    let (status, body) = send(&app, post_json("/api/face/verify", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["match"], true);
    assert_eq!(body["autoEnrolled"], false);
}

#[tokio::test]
async fn bodies_over_the_configured_limit_are_refused() {
    let store: Box<dyn FingerprintStore> = Box::new(InMemoryFingerprintStore::new());
    let service = FaceService::new(MatchSettings::new(25.0, 8).unwrap(), store);
    let app = build_router(AppState::new(service, vec![]).with_body_limit(1024));

    let request = json!({"userId": "u7", "imageBase64": large_photo_payload(64, 64)});
    let (status, body) = send(&app, post_json("/api/face/verify", request)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["detail"].is_string());

    let small = json!({"userId": "u7", "imageBase64": face_payload(0)});
    let (status, _) = send(&app, post_json("/api/face/verify", small)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_user_id_is_rejected() {
    let app = memory_app(25.0);
    let request = json!({"userId": "", "imageBase64": face_payload(0)});
    let (status, body) = send(&app, post_json("/api/face/enroll", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("identity"));
}

#[tokio::test]
async fn malformed_body_is_rejected_before_the_core() {
    let app = memory_app(25.0);
    let (status, body) = send(&app, post_json("/api/face/enroll", json!({"userId": "u4"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("imageBase64"));
}

#[tokio::test]
async fn store_failures_hide_their_cause() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("fingerprints");
    let store: Box<dyn FingerprintStore> = Box::new(FilesystemFingerprintStore::open(&dir).unwrap());
    let service = FaceService::new(MatchSettings::new(25.0, 8).unwrap(), store);
    let app = build_router(AppState::new(service, vec![]));
    fs::remove_dir_all(&dir).unwrap();

    let request = json!({"userId": "u5", "imageBase64": face_payload(0)});
    let (status, body) = send(&app, post_json("/api/face/enroll", request.clone())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "Internal server error during face enrollment"}));

    let (status, body) = send(&app, post_json("/api/face/verify", request)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "Internal server error during face verification"}));
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let app = memory_app(25.0);
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/face/verify")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/face/verify")
        .header(header::ORIGIN, "http://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
