//! Feed event data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::agent::Agent;

/// Default drama score for a new event.
pub const DEFAULT_EVENT_DRAMA: i64 = 50;

/// Drama score at which an event becomes a highlight without being featured.
pub const HIGHLIGHT_DRAMA_THRESHOLD: i64 = 75;

/// Maximum number of highlights returned.
pub const HIGHLIGHT_LIMIT: i64 = 20;

/// Event entity from database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub relationship_id: Option<String>,
    pub description: String,
    pub drama_score: i64,
    pub is_public: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_highlight(&self) -> bool {
        self.is_featured || self.drama_score >= HIGHLIGHT_DRAMA_THRESHOLD
    }
}

/// Event with its involved agents loaded.
#[derive(Debug, Clone, Serialize)]
pub struct EventWithAgents {
    #[serde(flatten)]
    pub event: Event,
    pub agents: Vec<Agent>,
}

/// Request to record an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub agent_ids: Vec<String>,
    pub relationship_id: Option<String>,
    #[serde(default)]
    pub description: String,
    pub drama_score: Option<i64>,
    pub is_public: Option<bool>,
    pub is_featured: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(drama_score: i64, is_featured: bool) -> Event {
        Event {
            id: "evt_1".to_string(),
            event_type: "recoupling".to_string(),
            relationship_id: None,
            description: String::new(),
            drama_score,
            is_public: true,
            is_featured,
            created_at: crate::db::now(),
        }
    }

    #[test]
    fn test_is_highlight() {
        assert!(event(75, false).is_highlight());
        assert!(event(10, true).is_highlight());
        assert!(!event(74, false).is_highlight());
    }

    #[test]
    fn test_event_serializes_type_field() {
        let json = serde_json::to_value(event(50, false)).unwrap();
        assert_eq!(json["type"], "recoupling");
        assert_eq!(json["isPublic"], true);
        assert!(json.get("eventType").is_none());
    }
}
