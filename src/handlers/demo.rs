//! Static demo content served at the root.

use axum::{response::Html, Json};
use serde_json::{json, Value};

pub async fn welcome() -> &'static str {
    "HELLO and Welcome"
}

pub async fn html() -> Html<&'static str> {
    Html("<h1>Hello World</h1>")
}

pub async fn hello() -> Json<Value> {
    Json(json!({ "name": "Hello", "age": 32, "email": "me@me.com" }))
}
