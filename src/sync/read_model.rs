//! Immutable snapshot handed to presentational collaborators.

use serde::Serialize;

use crate::connection::ConnectionState;
use crate::game::{MoveRecord, Position};
use crate::phase::PhaseView;

/// Everything a display needs, frozen at one point in time.
///
/// A new value is built for every update; holders of an older snapshot
/// never see it change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadModel {
    /// Current position
    pub position: Position,
    /// Move history, oldest first
    pub history: Vec<MoveRecord>,
    pub connection_state: ConnectionState,
    pub phase: PhaseView,
    /// Legal moves for the side to move, in SAN
    pub available_moves: Vec<String>,
    /// Reconnects made since start
    pub reconnect_attempts: u64,
}

impl ReadModel {
    /// SAN of the last move, if any.
    #[must_use]
    pub fn last_san(&self) -> Option<&str> {
        self.history.last().map(|record| record.san.as_str())
    }
}
