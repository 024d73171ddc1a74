//! Relationships between pairs of agents.
//!
//! At most one relationship exists per unordered agent pair; creating an
//! existing pair returns the stored record.

mod models;
mod repository;

pub use models::{
    CreateOutcome, CreateRelationshipRequest, DEFAULT_RELATIONSHIP_SCORE, Relationship,
    RelationshipStatus, RelationshipUpdate, RelationshipWithAgents, UpdateRelationshipRequest,
    parse_date,
};
pub use repository::RelationshipRepository;
