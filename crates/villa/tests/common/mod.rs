//! Test utilities and common setup.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;
use villa::api::{self, AppState};
use villa::db::Database;
use villa::ws::RealtimeHub;

/// Create application state over a fresh in-memory database.
pub async fn test_state() -> AppState {
    let db = Database::in_memory().await.unwrap();
    AppState::new(&db, Arc::new(RealtimeHub::new()), Vec::new())
}

/// Create a test application with all repositories initialized.
pub async fn test_app() -> Router {
    api::create_router(test_state().await)
}

/// Send a request with an optional JSON body and return status and JSON.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

/// Upsert a bare agent with the given id and name.
pub async fn seed_agent(app: &Router, id: &str, name: &str) {
    let (status, _) = post(app, "/agents", serde_json::json!({"id": id, "name": name})).await;
    assert_eq!(status, StatusCode::OK);
}

/// Create a relationship between two seeded agents and return its id.
pub async fn seed_relationship(app: &Router, agent1: &str, agent2: &str) -> String {
    let (status, json) = post(
        app,
        "/relationships",
        serde_json::json!({"agent1Id": agent1, "agent2Id": agent2}),
    )
    .await;
    assert!(status.is_success(), "unexpected status {status}: {json}");
    json["id"].as_str().unwrap().to_string()
}
