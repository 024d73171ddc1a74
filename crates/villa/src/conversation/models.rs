//! Conversation and message data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::agent::Agent;

/// Conversation entity from database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub relationship_id: String,
    pub last_message_at: DateTime<Utc>,
    pub drama_score: i64,
    pub viral_potential: i64,
    pub created_at: DateTime<Utc>,
}

/// Conversation with its messages in chronological order.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Message entity from database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub from_agent_id: String,
    pub to_agent_id: String,
    pub content: String,
    pub sentiment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Message with sender and recipient loaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithAgents {
    #[serde(flatten)]
    pub message: Message,
    pub from_agent: Agent,
    pub to_agent: Agent,
}

/// Request to open a conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub relationship_id: String,
}

/// Query parameters for listing conversations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationListQuery {
    pub relationship_id: Option<String>,
}

/// Request to post a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub conversation_id: String,
    pub from_agent_id: String,
    pub to_agent_id: String,
    pub content: String,
    pub sentiment: Option<String>,
}

/// Drama update body; only present fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDramaRequest {
    pub drama_score: Option<i64>,
    pub viral_potential: Option<i64>,
}
