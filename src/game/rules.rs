//! Rules-engine capability.
//!
//! The game layer never decides legality itself. It asks a
//! [`RulesEngine`] to list legal moves and to apply candidate moves,
//! and only stores what the engine hands back. [`StandardRules`] is the
//! production engine, backed by `shakmaty`.

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _, Role};

use crate::error::MoveError;

use super::types::{Move, PieceKind, Position, Square};

/// Outcome of a successful [`RulesEngine::apply_move`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Position after the move
    pub position: Position,
    /// Standard algebraic notation of the move, including `+`/`#`
    pub san: String,
}

/// Chess legality oracle.
///
/// Implementations must be pure: the same position and move always give
/// the same answer, and the input position is never mutated.
pub trait RulesEngine: Send + Sync + fmt::Debug {
    /// The standard starting position.
    fn initial_position(&self) -> Position;

    /// Every legal move in `position`, castling expressed as the king's
    /// two-square step.
    fn legal_moves(&self, position: &Position) -> Vec<Move>;

    /// Applies `mv` to `position`.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Illegal`] when the move is not legal in
    /// `position`.
    fn apply_move(&self, position: &Position, mv: &Move) -> Result<AppliedMove, MoveError>;

    /// Compact exchange notation of `position` for display.
    fn to_display_notation(&self, position: &Position) -> String;
}

/// Standard chess rules delegated to `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl StandardRules {
    /// Creates the standard rules engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn parse(position: &Position) -> Option<Chess> {
        let fen: Fen = position.fen().parse().ok()?;
        fen.into_position(CastlingMode::Standard).ok()
    }

    fn encode(chess: Chess) -> Position {
        Position::from_fen(Fen::from_setup(chess.into_setup(EnPassantMode::Legal)).to_string())
    }
}

impl RulesEngine for StandardRules {
    fn initial_position(&self) -> Position {
        Self::encode(Chess::default())
    }

    fn legal_moves(&self, position: &Position) -> Vec<Move> {
        let Some(chess) = Self::parse(position) else {
            tracing::warn!(fen = %position, "rules engine could not parse position");
            return Vec::new();
        };
        chess
            .legal_moves()
            .iter()
            .filter_map(|m| match m.to_uci(CastlingMode::Standard) {
                UciMove::Normal {
                    from,
                    to,
                    promotion,
                } => Some(Move {
                    from: from_engine_square(from)?,
                    to: from_engine_square(to)?,
                    promotion: promotion.map(from_engine_role),
                }),
                _ => None,
            })
            .collect()
    }

    fn apply_move(&self, position: &Position, mv: &Move) -> Result<AppliedMove, MoveError> {
        let illegal = || MoveError::Illegal(mv.to_string());
        let mut chess = Self::parse(position).ok_or_else(illegal)?;

        let uci = UciMove::Normal {
            from: to_engine_square(mv.from),
            to: to_engine_square(mv.to),
            promotion: mv.promotion.map(to_engine_role),
        };
        let legal = uci.to_move(&chess).map_err(|_| illegal())?;

        let san = SanPlus::from_move_and_play_unchecked(&mut chess, &legal);
        Ok(AppliedMove {
            position: Self::encode(chess),
            san: san.to_string(),
        })
    }

    fn to_display_notation(&self, position: &Position) -> String {
        position.fen().to_string()
    }
}

fn to_engine_square(square: Square) -> shakmaty::Square {
    shakmaty::Square::new(u32::from(square.index()))
}

fn from_engine_square(square: shakmaty::Square) -> Option<Square> {
    Square::from_index(square as u8)
}

const fn to_engine_role(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

const fn from_engine_role(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    #[test]
    fn test_initial_position_is_standard() {
        let rules = StandardRules::new();
        assert_eq!(rules.initial_position().fen(), START_FEN);
    }

    #[test]
    fn test_twenty_opening_moves() {
        let rules = StandardRules::new();
        let moves = rules.legal_moves(&rules.initial_position());
        assert_eq!(moves.len(), 20);
        assert!(moves.contains(&mv("e2e4")));
        assert!(moves.contains(&mv("g1f3")));
    }

    #[test]
    fn test_apply_pawn_push() {
        let rules = StandardRules::new();
        let applied = rules
            .apply_move(&rules.initial_position(), &mv("e2e4"))
            .unwrap();
        assert_eq!(applied.san, "e4");
        assert_eq!(
            applied.position.fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_input_position_untouched() {
        let rules = StandardRules::new();
        let start = rules.initial_position();
        let _ = rules.apply_move(&start, &mv("e2e4")).unwrap();
        assert_eq!(start.fen(), START_FEN);
    }

    #[test]
    fn test_illegal_moves_rejected() {
        let rules = StandardRules::new();
        let start = rules.initial_position();
        for bad in ["e1e1", "e2e5", "e7e5", "g1g3"] {
            assert_eq!(
                rules.apply_move(&start, &mv(bad)),
                Err(MoveError::Illegal(bad.to_string())),
                "{bad} should be illegal"
            );
        }
    }

    #[test]
    fn test_castling_by_king_step() {
        let rules = StandardRules::new();
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert!(rules.legal_moves(&pos).contains(&mv("e1g1")));
        let applied = rules.apply_move(&pos, &mv("e1g1")).unwrap();
        assert_eq!(applied.san, "O-O");
        let queenside = rules.apply_move(&pos, &mv("e1c1")).unwrap();
        assert_eq!(queenside.san, "O-O-O");
    }

    #[test]
    fn test_promotion_requires_piece() {
        let rules = StandardRules::new();
        let pos = Position::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        assert!(rules.apply_move(&pos, &mv("e7e8")).is_err());
        let applied = rules.apply_move(&pos, &mv("e7e8q")).unwrap();
        assert_eq!(applied.san, "e8=Q");
        let under = rules.apply_move(&pos, &mv("e7e8n")).unwrap();
        assert_eq!(under.san, "e8=N");
    }

    #[test]
    fn test_check_and_mate_suffixes() {
        let rules = StandardRules::new();
        let mut pos = rules.initial_position();
        let mut last = String::new();
        for m in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            let applied = rules.apply_move(&pos, &mv(m)).unwrap();
            pos = applied.position;
            last = applied.san;
        }
        assert_eq!(last, "Qh4#");
        assert!(rules.legal_moves(&pos).is_empty());
    }

    #[test]
    fn test_garbage_position_yields_nothing() {
        let rules = StandardRules::new();
        let pos = Position::from_fen("not a fen");
        assert!(rules.legal_moves(&pos).is_empty());
        assert!(rules.apply_move(&pos, &mv("e2e4")).is_err());
    }

    #[test]
    fn test_display_notation_is_fen() {
        let rules = StandardRules::new();
        assert_eq!(
            rules.to_display_notation(&rules.initial_position()),
            START_FEN
        );
    }
}
