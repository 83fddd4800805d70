//! Synchronization core
//!
//! Routes connection events into the game and phase layers, forwards
//! accepted local moves to the coordinator, and publishes a
//! [`ReadModel`] after every change.

pub mod core;
pub mod handle;
pub mod read_model;

pub use self::core::{SyncCore, SyncSettings};
pub use handle::{Command, SyncHandle};
pub use read_model::ReadModel;
