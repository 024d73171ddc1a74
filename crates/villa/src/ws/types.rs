//! Realtime topics and the frames pushed over them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::conversation::{Conversation, MessageWithAgents};
use crate::event::EventWithAgents;
use crate::feed::Envelope;
use crate::relationship::RelationshipWithAgents;

/// A named broadcast channel clients subscribe to via `/ws/{topic}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    VillaFeed,
    Conversations,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::VillaFeed, Topic::Conversations];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::VillaFeed => "villa-feed",
            Topic::Conversations => "conversations",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "villa-feed" => Ok(Topic::VillaFeed),
            "conversations" => Ok(Topic::Conversations),
            other => Err(format!("unknown topic: {other}")),
        }
    }
}

/// Server to client frame, serialized as `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    /// Current number of `villa-feed` subscribers.
    ClientCount(usize),
    RelationshipUpdate(RelationshipWithAgents),
    NewMessage(Envelope<MessageWithAgents>),
    NewEvent(Envelope<EventWithAgents>),
    NewConversation(Conversation),
}

impl RealtimeEvent {
    /// Topic this event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            RealtimeEvent::NewConversation(_) => Topic::Conversations,
            RealtimeEvent::ClientCount(_)
            | RealtimeEvent::RelationshipUpdate(_)
            | RealtimeEvent::NewMessage(_)
            | RealtimeEvent::NewEvent(_) => Topic::VillaFeed,
        }
    }

    /// Frame name, as seen by clients.
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::ClientCount(_) => "client-count",
            RealtimeEvent::RelationshipUpdate(_) => "relationship-update",
            RealtimeEvent::NewMessage(_) => "new-message",
            RealtimeEvent::NewEvent(_) => "new-event",
            RealtimeEvent::NewConversation(_) => "new-conversation",
        }
    }
}

/// Subscriber counts reported by `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberCounts {
    pub villa_feed: usize,
    pub conversations: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_topic_parse() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        assert!("villa_feed".parse::<Topic>().is_err());
    }

    #[test]
    fn test_frame_shape() {
        let json = serde_json::to_value(RealtimeEvent::ClientCount(3)).unwrap();
        assert_eq!(json, serde_json::json!({"event": "client-count", "data": 3}));
    }

    #[test]
    fn test_conversation_frames_go_to_conversations_topic() {
        let now = db::now();
        let event = RealtimeEvent::NewConversation(Conversation {
            id: "conv_1".to_string(),
            relationship_id: "rel_1".to_string(),
            last_message_at: now,
            drama_score: 0,
            viral_potential: 0,
            created_at: now,
        });
        assert_eq!(event.topic(), Topic::Conversations);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["data"]["relationshipId"], "rel_1");
    }
}
