//! Agent profiles.
//!
//! Agents are upserted by their externally supplied id; creation and update
//! share one code path.

mod models;
mod repository;

pub use models::{
    Agent, AgentPayload, AgentStatus, AgentUpsert, AgentWithRelationships, BigFive,
    BulkUpsertResponse, DEFAULT_TRAIT_SCORE, RomanceStyle, TraitPrecedence,
    UpdateAgentStatusRequest,
};
pub use repository::AgentRepository;
