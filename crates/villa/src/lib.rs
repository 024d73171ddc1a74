//! Villa backend: agent profiles, relationships, conversations, events and a
//! live feed, served over REST and WebSocket.

pub mod agent;
pub mod api;
pub mod config;
pub mod conversation;
pub mod db;
pub mod event;
pub mod feed;
pub mod relationship;
pub mod waitlist;
pub mod ws;
