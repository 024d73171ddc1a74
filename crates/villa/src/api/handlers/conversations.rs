//! Conversation and message handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::conversation::{
    Conversation, ConversationListQuery, ConversationWithMessages, CreateConversationRequest,
    CreateMessageRequest, MessageWithAgents, UpdateDramaRequest,
};
use crate::feed::Envelope;
use crate::ws::RealtimeEvent;

/// Open a conversation and announce it on the `conversations` topic.
#[instrument(skip(state, request))]
pub async fn create_conversation(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateConversationRequest>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let conversation = state
        .conversations
        .create(&request.relationship_id)
        .await?;

    state
        .realtime
        .emit(RealtimeEvent::NewConversation(conversation.clone()));

    info!(conversation_id = %conversation.id, "Created conversation");
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// List conversations, most recent activity first.
#[instrument(skip(state))]
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationListQuery>,
) -> ApiResult<Json<Vec<Conversation>>> {
    let conversations = state
        .conversations
        .list(query.relationship_id.as_deref())
        .await?;
    Ok(Json(conversations))
}

/// Get a conversation with its messages.
#[instrument(skip(state))]
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationWithMessages>> {
    state
        .conversations
        .get_with_messages(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Conversation {} not found", id)))
}

/// Update drama and virality scores of a conversation.
#[instrument(skip(state, request))]
pub async fn update_drama(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateDramaRequest>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state.conversations.update_drama(&id, request).await?;
    info!(
        conversation_id = %id,
        drama_score = conversation.drama_score,
        viral_potential = conversation.viral_potential,
        "Updated conversation drama"
    );
    Ok(Json(conversation))
}

/// Post a message and push it to the villa feed.
#[instrument(skip(state, request), fields(conversation_id = %request.conversation_id))]
pub async fn create_message(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageWithAgents>)> {
    let message = state.conversations.post_message(request).await?;

    state
        .realtime
        .emit(RealtimeEvent::NewMessage(Envelope::message(message.clone())));

    info!(message_id = %message.message.id, "Created message");
    Ok((StatusCode::CREATED, Json(message)))
}
