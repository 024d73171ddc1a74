//! Villa feed: events and messages merged into one timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::MessageWithAgents;
use crate::event::EventWithAgents;

/// Items returned when no `limit` is given.
pub const DEFAULT_FEED_LIMIT: usize = 50;

/// Upper bound on `limit`.
pub const MAX_FEED_LIMIT: usize = 500;

/// Discriminant of a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Event,
    Message,
}

/// `{type, data, timestamp}` wrapper used for feed items and for the
/// `new-message` / `new-event` broadcasts.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    #[serde(rename = "type")]
    pub kind: FeedKind,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl Envelope<MessageWithAgents> {
    pub fn message(message: MessageWithAgents) -> Self {
        Self {
            kind: FeedKind::Message,
            timestamp: message.message.created_at,
            data: message,
        }
    }
}

impl Envelope<EventWithAgents> {
    pub fn event(event: EventWithAgents) -> Self {
        Self {
            kind: FeedKind::Event,
            timestamp: event.event.created_at,
            data: event,
        }
    }
}

/// Payload of a feed item.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FeedData {
    Event(EventWithAgents),
    Message(MessageWithAgents),
}

pub type FeedItem = Envelope<FeedData>;

/// Query parameters for `GET /villa-feed`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

impl FeedQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_FEED_LIMIT).min(MAX_FEED_LIMIT)
    }
}

/// Merge the newest events and messages, newest first, keeping `limit` items.
///
/// Each input holds at most `limit` of its own kind, so the result is the
/// exact top `limit` only while neither source was cut short.
pub fn merge(
    events: Vec<EventWithAgents>,
    messages: Vec<MessageWithAgents>,
    limit: usize,
) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = events
        .into_iter()
        .map(|event| Envelope {
            kind: FeedKind::Event,
            timestamp: event.event.created_at,
            data: FeedData::Event(event),
        })
        .chain(messages.into_iter().map(|message| Envelope {
            kind: FeedKind::Message,
            timestamp: message.message.created_at,
            data: FeedData::Message(message),
        }))
        .collect();

    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::conversation::Message;
    use crate::event::Event;
    use chrono::{Duration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn event(id: &str, seconds: i64) -> EventWithAgents {
        EventWithAgents {
            event: Event {
                id: id.to_string(),
                event_type: "challenge".to_string(),
                relationship_id: None,
                description: String::new(),
                drama_score: 50,
                is_public: true,
                is_featured: false,
                created_at: at(seconds),
            },
            agents: Vec::new(),
        }
    }

    fn message(id: &str, seconds: i64) -> MessageWithAgents {
        let now = at(0);
        MessageWithAgents {
            message: Message {
                id: id.to_string(),
                conversation_id: "conv_1".to_string(),
                from_agent_id: "x".to_string(),
                to_agent_id: "y".to_string(),
                content: "hi".to_string(),
                sentiment: None,
                created_at: at(seconds),
            },
            from_agent: Agent::blank("x", now),
            to_agent: Agent::blank("y", now),
        }
    }

    fn ids(items: &[FeedItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match &item.data {
                FeedData::Event(e) => e.event.id.clone(),
                FeedData::Message(m) => m.message.id.clone(),
            })
            .collect()
    }

    #[test]
    fn test_merge_interleaves_by_timestamp() {
        let items = merge(
            vec![event("e1", 10), event("e2", 30)],
            vec![message("m1", 20), message("m2", 40)],
            10,
        );
        assert_eq!(ids(&items), vec!["m2", "e2", "m1", "e1"]);
        assert_eq!(items[0].kind, FeedKind::Message);
        assert_eq!(items[1].kind, FeedKind::Event);
    }

    #[test]
    fn test_merge_truncates_to_limit() {
        let items = merge(
            vec![event("e1", 1), event("e2", 2), event("e3", 3)],
            vec![message("m1", 4), message("m2", 5)],
            3,
        );
        assert_eq!(ids(&items), vec!["m2", "m1", "e3"]);
    }

    #[test]
    fn test_merge_empty_sources() {
        assert!(merge(Vec::new(), Vec::new(), 5).is_empty());
    }

    #[test]
    fn test_envelope_serialization() {
        let json = serde_json::to_value(Envelope::message(message("m1", 0))).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"]["id"], "m1");
        assert_eq!(json["data"]["fromAgent"]["id"], "x");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(FeedQuery::default().effective_limit(), DEFAULT_FEED_LIMIT);
        assert_eq!(FeedQuery { limit: Some(5) }.effective_limit(), 5);
        assert_eq!(FeedQuery { limit: Some(100_000) }.effective_limit(), MAX_FEED_LIMIT);
    }
}
