//! Cloneable front door to a running [`SyncCore`](super::SyncCore).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::error::MoveError;
use crate::game::{Move, MoveRecord, Square};

use super::read_model::ReadModel;

/// Request posted to the core's event loop.
#[derive(Debug)]
pub enum Command {
    /// Try a local move and report the outcome.
    Move {
        mv: Move,
        reply: oneshot::Sender<Result<MoveRecord, MoveError>>,
    },
    /// Return the game and phase to their initial state.
    Reset,
}

/// Talks to the core from any task.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    model: watch::Receiver<Arc<ReadModel>>,
}

impl SyncHandle {
    pub(super) const fn new(
        commands: mpsc::Sender<Command>,
        model: watch::Receiver<Arc<ReadModel>>,
    ) -> Self {
        Self { commands, model }
    }

    /// Submits a local move and waits for the core's verdict.
    ///
    /// # Errors
    ///
    /// Returns the rules engine's rejection, or [`MoveError::Unavailable`]
    /// if the core has stopped.
    pub async fn attempt_move(&self, mv: Move) -> Result<MoveRecord, MoveError> {
        let (reply, verdict) = oneshot::channel();
        self.commands
            .send(Command::Move { mv, reply })
            .await
            .map_err(|_| MoveError::Unavailable)?;
        verdict.await.map_err(|_| MoveError::Unavailable)?
    }

    /// The boolean move callback used by board displays.
    pub async fn on_user_move_attempt(&self, from: Square, to: Square) -> bool {
        self.attempt_move(Move::new(from, to)).await.is_ok()
    }

    /// Asks the core to reset the game. Returns `false` if the core has
    /// stopped.
    pub async fn reset_game(&self) -> bool {
        self.commands.send(Command::Reset).await.is_ok()
    }

    /// Latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ReadModel> {
        self.model.borrow().clone()
    }

    /// A receiver notified on every read-model update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ReadModel>> {
        self.model.clone()
    }
}
