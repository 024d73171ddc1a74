//! Feed-worthy events involving agents and, optionally, a relationship.

mod models;
mod repository;

pub use models::{
    CreateEventRequest, DEFAULT_EVENT_DRAMA, Event, EventWithAgents, HIGHLIGHT_DRAMA_THRESHOLD,
    HIGHLIGHT_LIMIT,
};
pub use repository::EventRepository;
