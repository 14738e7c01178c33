//! Transport-agnostic core of the logbook bot.
//!
//! The bot walks a user through browsing, searching and creating topics,
//! attaching stories to them and editing stories, while all persistence
//! lives behind a remote HTTP API. This crate holds everything that does
//! not depend on a concrete messaging platform: the data model, the
//! backend client, per-conversation sessions and the dialogue engine that
//! routes incoming events through an immutable transition table.

/// Remote topics/stories/users API client
pub mod backend;
/// Outbound messaging abstraction the engine renders through
pub mod channel;
/// Settings loaded from files and the environment
pub mod config;
/// The conversation state machine
pub mod dialogue;
/// Wire model shared by the backend client and the engine
pub mod model;
/// Screens and the rules for putting them on the channel
pub mod render;
/// Per-conversation state and the store that owns it
pub mod session;
/// Fakes and mocks for tests
pub mod testing;
