//! Chess game layer
//!
//! Move validation and application against an external rules engine.
//!
//! - [`types`]: squares, moves, positions and history records
//! - [`rules`]: the [`RulesEngine`] capability and its `shakmaty` backing
//! - [`state`]: [`GameState`], the authoritative position and history

pub mod rules;
pub mod state;
pub mod types;

pub use rules::{AppliedMove, RulesEngine, StandardRules};
pub use state::GameState;
pub use types::{Move, MoveRecord, MoveSource, PieceKind, Position, Square};
