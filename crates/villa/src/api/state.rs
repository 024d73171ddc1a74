//! Application state shared across handlers.

use std::sync::Arc;

use crate::agent::AgentRepository;
use crate::conversation::ConversationRepository;
use crate::db::Database;
use crate::event::EventRepository;
use crate::relationship::RelationshipRepository;
use crate::waitlist::WaitlistRepository;
use crate::ws::RealtimeHub;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub agents: AgentRepository,
    pub relationships: RelationshipRepository,
    pub conversations: ConversationRepository,
    pub events: EventRepository,
    pub waitlist: WaitlistRepository,
    /// Realtime hub for the `villa-feed` and `conversations` topics.
    pub realtime: Arc<RealtimeHub>,
    /// Origins allowed by CORS; empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    /// Build the state over one shared pool.
    pub fn new(db: &Database, realtime: Arc<RealtimeHub>, allowed_origins: Vec<String>) -> Self {
        let pool = db.pool().clone();
        Self {
            agents: AgentRepository::new(pool.clone()),
            relationships: RelationshipRepository::new(pool.clone()),
            conversations: ConversationRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            waitlist: WaitlistRepository::new(pool),
            realtime,
            allowed_origins,
        }
    }
}
