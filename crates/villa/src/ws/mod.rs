//! Realtime fan-out over WebSocket.
//!
//! Two topics share the `/ws/{topic}` endpoint:
//!
//! ```text
//! villa-feed     client-count, relationship-update, new-message, new-event
//! conversations  new-conversation
//! ```
//!
//! Handlers publish through [`RealtimeHub::emit`] after their write is
//! committed. There is no replay; a subscriber sees only frames sent while
//! it is connected.

mod handler;
mod hub;
mod types;

pub use handler::ws_handler;
pub use hub::{RealtimeHub, Subscription};
pub use types::{RealtimeEvent, SubscriberCounts, Topic};
