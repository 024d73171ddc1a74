//! Health and status handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::state::AppState;
use crate::ws::SubscriberCounts;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Realtime subscriber counts per topic.
pub async fn status(State(state): State<AppState>) -> Json<SubscriberCounts> {
    Json(state.realtime.counts())
}
