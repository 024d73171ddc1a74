//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::ws::ws_handler;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.allowed_origins);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        // Agents
        .route("/agents", get(handlers::list_agents).post(handlers::upsert_agent))
        .route("/agents/bulk", post(handlers::bulk_upsert_agents))
        .route("/agents/{id}", get(handlers::get_agent))
        .route("/agents/{id}/status", put(handlers::update_agent_status))
        // Relationships
        .route(
            "/relationships",
            get(handlers::list_relationships).post(handlers::create_relationship),
        )
        .route("/relationships/{id}", put(handlers::update_relationship))
        // Conversations
        .route(
            "/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route("/conversations/{id}", get(handlers::get_conversation))
        .route("/conversations/{id}/drama", put(handlers::update_drama))
        .route("/messages", post(handlers::create_message))
        // Feed
        .route("/events", post(handlers::create_event))
        .route("/villa-feed", get(handlers::villa_feed))
        .route("/highlights", get(handlers::highlights))
        // Waitlist
        .route("/waitlist", post(handlers::join_waitlist))
        // Realtime
        .route("/ws/{topic}", get(ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer from the configured origins.
///
/// With no configured origins any origin is allowed.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::OPTIONS,
    ];

    let headers = [header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN];

    if allowed_origins.is_empty() {
        tracing::debug!("CORS: No origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::error!("CORS: All configured origins are invalid!");
        CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}
