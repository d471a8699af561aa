mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{send, test_app};
use serde_json::json;
use tower::ServiceExt; // for oneshot

#[tokio::test]
async fn demo_pages() {
    let app = test_app();

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"HELLO and Welcome");

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>Hello World</h1>");

    let (status, body) = send(&app, Method::GET, "/hello", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"name": "Hello", "age": 32, "email": "me@me.com"}));
}

#[tokio::test]
async fn health_and_ready() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    let (status, body) = send(&app, Method::GET, "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "blog-api");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = test_app();
    let big = "x".repeat(blog_api::app::BODY_LIMIT_BYTES + 1);
    let payload = json!({"name": big, "email": "a@b.c"}).to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn oversized_body_without_length_is_rejected() {
    let app = test_app();
    let big = "x".repeat(blog_api::app::BODY_LIMIT_BYTES + 1);
    let payload = json!({"name": big, "email": "a@b.c"}).to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .unwrap();
    assert!(req.headers().get(header::CONTENT_LENGTH).is_none());

    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let (_, all) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn cors_is_permissive() {
    let app = test_app();
    let req = Request::builder()
        .uri("/users")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
