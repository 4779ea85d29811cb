//! In-process request helpers shared by the handler tests.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

use crate::api::server::{AppState, build_router};
use crate::config::Config;
use crate::db::repo;

pub async fn test_app() -> (Router, SqlitePool) {
    let db = repo::connect("sqlite::memory:").await.unwrap();
    let app = build_router(Arc::new(AppState { db: db.clone() }), &Config::default());
    (app, db)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn create_user(app: &Router, username: &str, email: &str) -> Value {
    let (status, user) = send(
        app,
        Method::POST,
        "/api/v1/users",
        Some(json!({
            "username": username,
            "email": email,
            "password": "password123",
            "bio": "I am a test user",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    user
}

pub async fn create_post(app: &Router, user_id: &Value, content: &str) -> Value {
    let (status, post) = send(
        app,
        Method::POST,
        &format!("/api/v1/posts?user_id={user_id}"),
        Some(json!({ "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    post
}

pub async fn create_comment(
    app: &Router,
    user_id: &Value,
    post_id: &Value,
    parent_id: Option<&Value>,
    content: &str,
) -> Value {
    let (status, comment) = send(
        app,
        Method::POST,
        &format!("/api/v1/comments?user_id={user_id}"),
        Some(json!({ "content": content, "post_id": post_id, "parent_id": parent_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    comment
}

pub fn detail(body: &Value) -> String {
    body["detail"].as_str().unwrap_or_default().to_lowercase()
}
