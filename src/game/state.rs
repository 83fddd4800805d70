//! Authoritative local game state.
//!
//! Holds the current position and the append-only move history. Both
//! local and remote moves go through the same rules-engine check; a
//! rejected move leaves everything exactly as it was.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::MoveError;

use super::rules::RulesEngine;
use super::types::{Move, MoveRecord, MoveSource, PieceKind, Position, Square};

/// Current position plus move history for one game session.
#[derive(Debug)]
pub struct GameState {
    rules: Arc<dyn RulesEngine>,
    position: Position,
    history: Vec<MoveRecord>,
}

impl GameState {
    /// Starts a game at the engine's initial position.
    #[must_use]
    pub fn new(rules: Arc<dyn RulesEngine>) -> Self {
        let position = rules.initial_position();
        Self {
            rules,
            position,
            history: Vec::new(),
        }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    /// Move history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    /// Legal moves in the current position.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        self.rules.legal_moves(&self.position)
    }

    /// Legal moves in the current position, in SAN.
    #[must_use]
    pub fn available_moves_san(&self) -> Vec<String> {
        self.legal_moves()
            .iter()
            .filter_map(|mv| self.rules.apply_move(&self.position, mv).ok())
            .map(|applied| applied.san)
            .collect()
    }

    /// Display notation of the current position.
    #[must_use]
    pub fn display_notation(&self) -> String {
        self.rules.to_display_notation(&self.position)
    }

    /// Validates and applies a move attempted by the local user.
    ///
    /// A pawn move to the last rank without an explicit promotion piece
    /// promotes to a queen.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Illegal`] if the rules engine rejects the move;
    /// the game state is unchanged in that case.
    pub fn try_local_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<MoveRecord, MoveError> {
        self.apply(from, to, promotion, MoveSource::Local)
    }

    /// Validates and applies a move pushed by the remote coordinator.
    ///
    /// Remote moves are not trusted: they take exactly the same path as
    /// local moves.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Illegal`] if the rules engine rejects the move;
    /// the game state is unchanged in that case.
    pub fn apply_remote_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<MoveRecord, MoveError> {
        self.apply(from, to, promotion, MoveSource::Remote)
    }

    /// Returns to the initial position and clears the history.
    pub fn reset(&mut self) {
        self.position = self.rules.initial_position();
        self.history.clear();
        info!("game reset to initial position");
    }

    fn apply(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        source: MoveSource,
    ) -> Result<MoveRecord, MoveError> {
        let promotion = promotion.or_else(|| self.default_promotion(from, to));
        let mv = Move::new(from, to).with_promotion(promotion);

        let applied = match self.rules.apply_move(&self.position, &mv) {
            Ok(applied) => applied,
            Err(err) => {
                warn!(source = source.as_str(), %mv, fen = %self.position, "move rejected");
                return Err(err);
            }
        };

        let record = MoveRecord {
            mv,
            resulting_position: applied.position,
            san: applied.san,
            source,
        };
        self.position = record.resulting_position.clone();
        self.history.push(record.clone());

        debug!(
            source = source.as_str(),
            san = %record.san,
            ply = self.history.len(),
            "move applied"
        );
        Ok(record)
    }

    /// Queen when `from -> to` is only legal as a promotion.
    fn default_promotion(&self, from: Square, to: Square) -> Option<PieceKind> {
        self.rules
            .legal_moves(&self.position)
            .iter()
            .any(|m| m.from == from && m.to == to && m.promotion.is_some())
            .then_some(PieceKind::Queen)
    }
}
