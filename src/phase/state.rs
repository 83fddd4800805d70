//! Phase values and their read-model projection.

use std::fmt;

use serde::Serialize;

/// Pacing phase of the surrounding vote mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    /// No vote is running.
    #[default]
    Idle,
    /// A vote is counting down.
    Voting {
        /// Seconds left, as last reported by the server
        remaining: u32,
        /// Duration of the current round
        total: u32,
    },
    /// The server reported the vote clock at zero.
    Expired,
}

impl Phase {
    /// Label used in logs, events and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Voting { .. } => "voting",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voting { remaining, total } => write!(f, "voting({remaining}/{total})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Record of a phase change, produced only when the phase actually moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    /// Phase before the frame
    pub from: Phase,
    /// Phase after the frame
    pub to: Phase,
    /// Whether the frame opened a new voting round
    pub new_round: bool,
}

/// What a progress display needs to know about the phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseView {
    /// The phase itself
    pub phase: Phase,
    /// Remaining share of the round in `[0, 100]`; 100 when idle
    pub percentage: f64,
    /// Whether a countdown should be shown at all
    pub progress_visible: bool,
    /// Countdown text, absent when idle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}
