//! Realtime hub: per-topic connection registries and broadcast channels.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{RealtimeEvent, SubscriberCounts, Topic};

/// Frames buffered per topic before slow subscribers start skipping.
const EVENT_BUFFER_SIZE: usize = 256;

/// Live connections of one topic plus its fan-out channel.
struct TopicChannel {
    /// Connection ID -> connected at
    connections: DashMap<Uuid, DateTime<Utc>>,
    /// Pre-serialized frames
    frames: broadcast::Sender<String>,
}

impl TopicChannel {
    fn new() -> Self {
        let (frames, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            connections: DashMap::new(),
            frames,
        }
    }
}

/// A registered connection on a topic.
pub struct Subscription {
    pub id: Uuid,
    pub topic: Topic,
    pub frames: broadcast::Receiver<String>,
}

/// Hub tracking realtime subscribers and broadcasting events to them.
///
/// The subscriber count of a topic is the size of its registry; there is
/// no separate counter to drift.
pub struct RealtimeHub {
    villa_feed: TopicChannel,
    conversations: TopicChannel,
    shutdown: CancellationToken,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            villa_feed: TopicChannel::new(),
            conversations: TopicChannel::new(),
            shutdown: CancellationToken::new(),
        }
    }

    fn channel(&self, topic: Topic) -> &TopicChannel {
        match topic {
            Topic::VillaFeed => &self.villa_feed,
            Topic::Conversations => &self.conversations,
        }
    }

    /// Register a connection on `topic`.
    ///
    /// The receiver is created before the connection is counted, so a
    /// `villa-feed` subscriber sees the `client-count` its own arrival caused.
    pub fn connect(&self, topic: Topic) -> Subscription {
        let channel = self.channel(topic);
        let frames = channel.frames.subscribe();
        let id = Uuid::new_v4();
        channel.connections.insert(id, Utc::now());
        info!("Client {} connected to {}", id, topic);

        if topic == Topic::VillaFeed {
            self.emit(RealtimeEvent::ClientCount(channel.connections.len()));
        }

        Subscription { id, topic, frames }
    }

    /// Remove a connection from `topic`.
    pub fn disconnect(&self, topic: Topic, id: Uuid) {
        let channel = self.channel(topic);
        if channel.connections.remove(&id).is_none() {
            return;
        }
        info!("Client {} disconnected from {}", id, topic);

        if topic == Topic::VillaFeed {
            self.emit(RealtimeEvent::ClientCount(channel.connections.len()));
        }
    }

    /// Publish an event to every subscriber of its topic.
    ///
    /// Best-effort: having no subscribers is not an error.
    pub fn emit(&self, event: RealtimeEvent) {
        let topic = event.topic();
        let frame = match serde_json::to_string(&event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to serialize {} frame: {}", event.name(), e);
                return;
            }
        };

        match self.channel(topic).frames.send(frame) {
            Ok(receivers) => debug!("Sent {} to {} receivers on {}", event.name(), receivers, topic),
            Err(_) => debug!("No receivers for {} on {}", event.name(), topic),
        }
    }

    /// Number of live connections on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channel(topic).connections.len()
    }

    pub fn counts(&self) -> SubscriberCounts {
        let villa_feed = self.subscriber_count(Topic::VillaFeed);
        let conversations = self.subscriber_count(Topic::Conversations);
        SubscriberCounts {
            villa_feed,
            conversations,
            total: villa_feed + conversations,
        }
    }

    /// Token cancelled when the server shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ask every open socket to close.
    pub fn shutdown(&self) {
        info!("Closing {} realtime connections", self.counts().total);
        self.shutdown.cancel();
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_frame(sub: &mut Subscription) -> serde_json::Value {
        let frame = sub.frames.try_recv().unwrap();
        serde_json::from_str(&frame).unwrap()
    }

    #[test]
    fn test_connecting_client_sees_its_own_count() {
        let hub = RealtimeHub::new();
        let mut first = hub.connect(Topic::VillaFeed);
        assert_eq!(next_frame(&mut first)["data"], 1);

        let mut second = hub.connect(Topic::VillaFeed);
        assert_eq!(next_frame(&mut first)["data"], 2);
        assert_eq!(next_frame(&mut second)["data"], 2);

        hub.disconnect(Topic::VillaFeed, second.id);
        assert_eq!(next_frame(&mut first)["data"], 1);
        assert_eq!(hub.subscriber_count(Topic::VillaFeed), 1);
    }

    #[test]
    fn test_topics_are_independent() {
        let hub = RealtimeHub::new();
        let mut feed = hub.connect(Topic::VillaFeed);
        let mut convos = hub.connect(Topic::Conversations);
        let _ = next_frame(&mut feed);

        // conversations has no client-count frames
        assert!(convos.frames.try_recv().is_err());
        assert_eq!(
            hub.counts(),
            SubscriberCounts {
                villa_feed: 1,
                conversations: 1,
                total: 2
            }
        );
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let hub = RealtimeHub::new();
        let mut sub = hub.connect(Topic::VillaFeed);
        let _ = next_frame(&mut sub);
        hub.disconnect(Topic::VillaFeed, sub.id);
        hub.disconnect(Topic::VillaFeed, sub.id);

        assert_eq!(hub.subscriber_count(Topic::VillaFeed), 0);
        assert_eq!(next_frame(&mut sub)["data"], 0);
        assert!(sub.frames.try_recv().is_err());
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let hub = RealtimeHub::new();
        hub.emit(RealtimeEvent::ClientCount(0));
        assert_eq!(hub.counts().total, 0);
    }

    #[test]
    fn test_shutdown_cancels_token() {
        let hub = RealtimeHub::new();
        let token = hub.shutdown_token();
        assert!(!token.is_cancelled());
        hub.shutdown();
        assert!(token.is_cancelled());
    }
}
