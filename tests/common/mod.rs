#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use blog_api::{app, AppState, MemoryStore, RESOURCES};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

pub fn test_app() -> Router {
    test_app_with(Arc::new(MemoryStore::new(&RESOURCES)))
}

pub fn test_app_with(store: Arc<MemoryStore>) -> Router {
    app(AppState::new(store))
}

/// Timestamp well before any request made by a test.
pub const LONG_AGO: &str = "2020-01-01T00:00:00.000Z";

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn create_user(app: &Router, name: &str, email: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/users",
        Some(serde_json::json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create user: {body}");
    body
}

pub async fn create_post(app: &Router, created_by: &Value, title: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/posts",
        Some(serde_json::json!({ "title": title, "content": "Body text", "created_by": created_by })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create post: {body}");
    body
}
