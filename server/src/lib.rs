//! Authoritative server for the network infection game: wire protocol
//! handling, the shared world state and the event feed.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod game;
pub mod network;
pub mod players;
pub mod predicates;

/// Logging targets, one per subsystem, matching the configuration keys.
pub const GAME_EVENTS: &str = "game_events";
pub const NETWORK_EVENTS: &str = "network_events";
pub const API_EVENTS: &str = "api_events";
