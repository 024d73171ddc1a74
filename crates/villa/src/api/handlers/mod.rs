//! API request handlers.

mod agents;
mod conversations;
mod feed;
mod misc;
mod relationships;
mod waitlist;

pub use agents::*;
pub use conversations::*;
pub use feed::*;
pub use misc::*;
pub use relationships::*;
pub use waitlist::*;
