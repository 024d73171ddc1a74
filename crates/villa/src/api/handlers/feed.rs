//! Event, feed and highlight handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use tracing::{debug, info, instrument};

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::event::{CreateEventRequest, EventWithAgents};
use crate::feed::{self, Envelope, FeedItem, FeedQuery};
use crate::ws::RealtimeEvent;

/// Record an event and push it to the villa feed.
#[instrument(skip(state, request), fields(event_type = %request.event_type))]
pub async fn create_event(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<EventWithAgents>)> {
    let event = state.events.create(request).await?;

    state
        .realtime
        .emit(RealtimeEvent::NewEvent(Envelope::event(event.clone())));

    info!(event_id = %event.event.id, "Created event");
    Ok((StatusCode::CREATED, Json(event)))
}

/// Recent public events and messages, newest first.
#[instrument(skip(state))]
pub async fn villa_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<Vec<FeedItem>>> {
    let limit = query.effective_limit();
    let fetch = limit as i64;

    let (events, messages) = tokio::try_join!(
        state.events.recent_public(fetch),
        state.conversations.recent_messages(fetch),
    )?;

    let items = feed::merge(events, messages, limit);
    debug!(count = items.len(), "Built villa feed");
    Ok(Json(items))
}

/// Featured or high-drama events.
#[instrument(skip(state))]
pub async fn highlights(State(state): State<AppState>) -> ApiResult<Json<Vec<EventWithAgents>>> {
    let events = state.events.highlights().await?;
    Ok(Json(events))
}
