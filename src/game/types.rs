//! Board vocabulary shared by the game layer and the wire protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MoveError;

/// One of the 64 board squares, indexed `file + 8 * rank` from a1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Square(u8);

impl Square {
    /// Builds a square from zero-based file (a = 0) and rank (1 = 0).
    #[must_use]
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self(file + 8 * rank))
        } else {
            None
        }
    }

    /// Builds a square from its zero-based index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Zero-based index, a1 = 0 through h8 = 63.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Zero-based file, a = 0.
    #[must_use]
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// Zero-based rank, 1 = 0.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }
}

impl FromStr for Square {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MoveError::InvalidSquare(s.to_string());
        let &[file, rank] = s.as_bytes() else {
            return Err(invalid());
        };
        let file = file.to_ascii_lowercase();
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(invalid());
        }
        Self::new(file - b'a', rank - b'1').ok_or_else(invalid)
    }
}

impl TryFrom<String> for Square {
    type Error = MoveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            char::from(b'a' + self.file()),
            char::from(b'1' + self.rank())
        )
    }
}

/// Chess piece kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    /// Pawn
    Pawn,
    /// Knight
    Knight,
    /// Bishop
    Bishop,
    /// Rook
    Rook,
    /// Queen
    Queen,
    /// King
    King,
}

impl PieceKind {
    /// Parses a promotion letter (`q`, `r`, `b`, `n`, either case).
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::InvalidPromotion`] for any other text,
    /// including pawn and king letters.
    pub fn from_promotion_str(s: &str) -> Result<Self, MoveError> {
        match s.to_ascii_lowercase().as_str() {
            "q" => Ok(Self::Queen),
            "r" => Ok(Self::Rook),
            "b" => Ok(Self::Bishop),
            "n" => Ok(Self::Knight),
            _ => Err(MoveError::InvalidPromotion(s.to_string())),
        }
    }

    /// Lowercase letter used in coordinate notation.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }
}

/// A candidate move in coordinate form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Origin square
    pub from: Square,
    /// Destination square (the king's destination for castling)
    pub to: Square,
    /// Piece to promote to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
}

impl Move {
    /// Creates a move without promotion.
    #[must_use]
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Returns this move with the given promotion piece.
    #[must_use]
    pub const fn with_promotion(mut self, promotion: Option<PieceKind>) -> Self {
        self.promotion = promotion;
        self
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{}", piece.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = MoveError;

    /// Parses coordinate notation such as `e2e4` or `e7e8q`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(MoveError::InvalidSquare(s.to_string()));
        }
        let from: Square = s[0..2].parse()?;
        let to: Square = s[2..4].parse()?;
        let promotion = if s.len() == 5 {
            Some(PieceKind::from_promotion_str(&s[4..])?)
        } else {
            None
        };
        Ok(Self::new(from, to).with_promotion(promotion))
    }
}

/// A full board state in FEN.
///
/// Values are only produced by a [`RulesEngine`](super::RulesEngine), so
/// every position held by the game state is reachable by legal play.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    /// Wraps a FEN string produced by a rules engine.
    #[must_use]
    pub fn from_fen(fen: impl Into<String>) -> Self {
        Self(fen.into())
    }

    /// The FEN text of this position.
    #[must_use]
    pub fn fen(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an applied move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveSource {
    /// Attempted by the local user
    Local,
    /// Pushed by the remote coordinator
    Remote,
}

impl MoveSource {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// One entry of the append-only move history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    /// The move as it was accepted (promotion filled in when defaulted)
    #[serde(rename = "move")]
    pub mv: Move,
    /// Position after the move
    pub resulting_position: Position,
    /// Standard algebraic notation, with check and mate suffixes
    pub san: String,
    /// Origin of the move
    pub source: MoveSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_parse_and_display() {
        let sq: Square = "e2".parse().unwrap();
        assert_eq!(sq.file(), 4);
        assert_eq!(sq.rank(), 1);
        assert_eq!(sq.index(), 12);
        assert_eq!(sq.to_string(), "e2");
    }

    #[test]
    fn test_square_corners() {
        assert_eq!("a1".parse::<Square>().unwrap().index(), 0);
        assert_eq!("h8".parse::<Square>().unwrap().index(), 63);
    }

    #[test]
    fn test_square_uppercase_file_accepted() {
        assert_eq!("E4".parse::<Square>().unwrap().to_string(), "e4");
    }

    #[test]
    fn test_square_rejects_garbage() {
        for bad in ["", "e", "e9", "i1", "e22", "11", "é1"] {
            assert_eq!(
                bad.parse::<Square>(),
                Err(MoveError::InvalidSquare(bad.to_string())),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_square_serde_as_string() {
        let sq: Square = "g1".parse().unwrap();
        assert_eq!(serde_json::to_string(&sq).unwrap(), "\"g1\"");
        let back: Square = serde_json::from_str("\"g1\"").unwrap();
        assert_eq!(back, sq);
        assert!(serde_json::from_str::<Square>("\"z0\"").is_err());
    }

    #[test]
    fn test_promotion_letters() {
        assert_eq!(PieceKind::from_promotion_str("q"), Ok(PieceKind::Queen));
        assert_eq!(PieceKind::from_promotion_str("N"), Ok(PieceKind::Knight));
        assert!(PieceKind::from_promotion_str("k").is_err());
        assert!(PieceKind::from_promotion_str("p").is_err());
        assert!(PieceKind::from_promotion_str("").is_err());
    }

    #[test]
    fn test_move_parse_coordinate_notation() {
        let mv: Move = "e2e4".parse().unwrap();
        assert_eq!(mv.from.to_string(), "e2");
        assert_eq!(mv.to.to_string(), "e4");
        assert_eq!(mv.promotion, None);

        let promo: Move = "e7e8q".parse().unwrap();
        assert_eq!(promo.promotion, Some(PieceKind::Queen));
        assert_eq!(promo.to_string(), "e7e8q");
    }

    #[test]
    fn test_move_parse_rejects_bad_length() {
        assert!("e2".parse::<Move>().is_err());
        assert!("e2e4qq".parse::<Move>().is_err());
        assert!("e7e8x".parse::<Move>().is_err());
    }

    #[test]
    fn test_move_record_serializes_move_key() {
        let record = MoveRecord {
            mv: "e2e4".parse().unwrap(),
            resulting_position: Position::from_fen("fen"),
            san: "e4".to_string(),
            source: MoveSource::Local,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["move"]["from"], "e2");
        assert_eq!(json["san"], "e4");
        assert_eq!(json["source"], "local");
        assert_eq!(json["resulting_position"], "fen");
    }
}
