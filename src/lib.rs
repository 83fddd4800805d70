//! `votechess` - live client for chat-voted chess games
//!
//! Keeps a local chess position in step with a remote vote coordinator over
//! a WebSocket: validated local moves go out as intents, authoritative moves
//! and vote-clock frames come back in, and every change is published as an
//! immutable [`sync::ReadModel`] snapshot.

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod observability;
pub mod phase;
pub mod protocol;
pub mod sync;
pub mod transport;
