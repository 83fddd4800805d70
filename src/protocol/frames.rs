//! Inbound frame classification.
//!
//! Every text frame from the coordinator lands in exactly one bucket:
//! a voting tick, an opponent move, or a reset signal. Frames that look
//! like one of the first two but carry bad fields are rejected as
//! malformed and never reach the game layer.

use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::game::{PieceKind, Square};

/// Marker value of `currentPhase` on voting frames.
const VOTING_PHASE: &str = "voting";

/// A classified inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundFrame {
    /// Vote countdown tick.
    Voting {
        /// Seconds left in the vote, as reported by the server
        remaining: u32,
    },
    /// Move chosen by the remote side.
    OpponentMove {
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    },
    /// Anything else: the phase returns to idle.
    Reset,
}

impl InboundFrame {
    /// Metric label for this frame kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Voting { .. } => "voting",
            Self::OpponentMove { .. } => "move",
            Self::Reset => "reset",
        }
    }
}

/// Classifies a text frame.
///
/// # Errors
///
/// Returns a [`ProtocolError`] when the text is not JSON, or when a voting
/// or move frame carries an unusable timer, square or promotion piece.
pub fn parse_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    if text.trim().is_empty() {
        return Ok(InboundFrame::Reset);
    }

    let value: Value = serde_json::from_str(text)?;
    let Value::Object(fields) = value else {
        return Ok(InboundFrame::Reset);
    };

    if fields.get("currentPhase").and_then(Value::as_str) == Some(VOTING_PHASE) {
        return parse_voting(&fields);
    }

    match (non_empty_str(&fields, "from"), non_empty_str(&fields, "to")) {
        (Some(from), Some(to)) => parse_move(&fields, from, to),
        _ => Ok(InboundFrame::Reset),
    }
}

/// Classifies a binary frame by decoding it as UTF-8 text first.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidUtf8`] for undecodable payloads, and
/// otherwise whatever [`parse_frame`] returns.
pub fn parse_binary_frame(bytes: &[u8]) -> Result<InboundFrame, ProtocolError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
    parse_frame(text)
}

fn parse_voting(fields: &Map<String, Value>) -> Result<InboundFrame, ProtocolError> {
    let timer = fields.get("timer");
    let remaining = timer
        .and_then(Value::as_u64)
        .and_then(|t| u32::try_from(t).ok())
        .ok_or_else(|| {
            ProtocolError::InvalidTimer(timer.map_or_else(|| "missing".to_string(), Value::to_string))
        })?;
    Ok(InboundFrame::Voting { remaining })
}

fn parse_move(
    fields: &Map<String, Value>,
    from: &str,
    to: &str,
) -> Result<InboundFrame, ProtocolError> {
    let from: Square = from
        .parse()
        .map_err(|_| ProtocolError::InvalidSquare(from.to_string()))?;
    let to: Square = to
        .parse()
        .map_err(|_| ProtocolError::InvalidSquare(to.to_string()))?;

    let promotion = match fields.get("promotion") {
        None | Some(Value::Null) => None,
        Some(Value::String(letter)) => Some(
            PieceKind::from_promotion_str(letter)
                .map_err(|_| ProtocolError::InvalidPromotion(letter.clone()))?,
        ),
        Some(other) => return Err(ProtocolError::InvalidPromotion(other.to_string())),
    };

    Ok(InboundFrame::OpponentMove {
        from,
        to,
        promotion,
    })
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
