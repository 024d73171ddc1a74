//! Conversations between coupled or talking agents, and their messages.

mod models;
mod repository;

pub use models::{
    Conversation, ConversationListQuery, ConversationWithMessages, CreateConversationRequest,
    CreateMessageRequest, Message, MessageWithAgents, UpdateDramaRequest,
};
pub use repository::ConversationRepository;
