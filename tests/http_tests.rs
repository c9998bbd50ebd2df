// Integration tests for the HTTP control surface

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{harness, small_device};
use reaction_capture::{create_router, AppState, CaptureConfig};
use tower::ServiceExt;

fn app() -> (Router, common::Harness) {
    let h = harness(small_device(), CaptureConfig::default());
    let router = create_router(AppState::new(h.session.clone()));
    (router, h)
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (router, _h) = app();

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test(start_paused = true)]
async fn test_start_before_prime_is_refused() {
    let (router, h) = app();

    let (status, json) = send(&router, "POST", "/session/start").await;

    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(json["outcome"], "not_ready");
    assert_eq!(h.devices.requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_prime_then_start() {
    let (router, h) = app();

    let (status, json) = send(&router, "POST", "/permission/prime").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["permission"], "ready");
    assert_eq!(json["status_text"], "📷 camera ready");

    let (status, json) = send(&router, "POST", "/session/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "started");

    let (status, json) = send(&router, "POST", "/session/start").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["outcome"], "already_active");

    let (status, json) = send(&router, "GET", "/session/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], true);
    assert_eq!(json["recorder_state"], "idle");

    h.session.wait_finished().await;

    let (_, json) = send(&router, "GET", "/session/status").await;
    assert_eq!(json["active"], false);
    assert_eq!(json["photos_saved"], 6);
    assert_eq!(json["videos_saved"], 1);
    assert_eq!(json["last_teardown"]["tracks_stopped"], 2);
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_failure_status() {
    let device = reaction_capture::SyntheticConfig {
        busy_after_prime: true,
        ..small_device()
    };
    let h = harness(device, CaptureConfig::default());
    let router = create_router(AppState::new(h.session.clone()));

    send(&router, "POST", "/permission/prime").await;
    let (status, json) = send(&router, "POST", "/session/start").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["outcome"], "acquisition_failed");
}
