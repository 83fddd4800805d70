//! Vote phase state machine.
//!
//! The controller is purely reactive: it never runs a clock of its own.
//! Every transition comes from a server frame, and the remaining time is
//! always the last value the server reported.

use tracing::{debug, info};

use super::state::{Phase, PhaseChange, PhaseView};

/// Tracks the vote phase from inbound frames.
///
/// Cycles between `Idle`, `Voting` and `Expired` for the lifetime of the
/// process; there is no terminal state.
#[derive(Debug, Clone)]
pub struct PhaseController {
    phase: Phase,
    /// Total used when a round's first frame already reads zero
    fallback_total: u32,
    /// Duration of the current (or last) round
    round_total: u32,
}

impl PhaseController {
    /// Creates an idle controller.
    ///
    /// `fallback_total` is the round duration assumed until a round
    /// reports its own starting value.
    #[must_use]
    pub const fn new(fallback_total: u32) -> Self {
        Self {
            phase: Phase::Idle,
            fallback_total,
            round_total: fallback_total,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Duration of the current round, or the fallback before any round.
    #[must_use]
    pub const fn round_total(&self) -> u32 {
        self.round_total
    }

    /// Handles a voting frame carrying `remaining` seconds.
    ///
    /// A frame opens a new round when the controller is idle, when it is
    /// expired and `remaining` is above zero, or when `remaining` went up.
    /// Within a round the total stays fixed at the round's first value.
    /// Repeating a frame is a no-op.
    pub fn on_voting_frame(&mut self, remaining: u32) -> Option<PhaseChange> {
        let new_round = match self.phase {
            Phase::Voting {
                remaining: previous,
                ..
            } => remaining > previous,
            Phase::Expired => remaining > 0,
            Phase::Idle => true,
        };

        if new_round {
            self.round_total = if remaining == 0 {
                self.fallback_total
            } else {
                remaining
            };
            info!(total = self.round_total, "voting round started");
        }

        let next = if remaining == 0 {
            Phase::Expired
        } else {
            Phase::Voting {
                remaining,
                total: self.round_total,
            }
        };
        self.transition(next, new_round)
    }

    /// Handles any frame without the voting marker.
    pub fn on_idle_frame(&mut self) -> Option<PhaseChange> {
        self.transition(Phase::Idle, false)
    }

    /// Returns to `Idle` on an external reset signal.
    pub fn reset(&mut self) -> Option<PhaseChange> {
        self.transition(Phase::Idle, false)
    }

    /// Remaining share of the round, clamped to `[0, 100]`.
    ///
    /// Idle reports 100, the "no active timer" value.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        match self.phase {
            Phase::Idle => 100.0,
            Phase::Expired => 0.0,
            Phase::Voting { remaining, total } => {
                if total == 0 {
                    return 0.0;
                }
                (100.0 * f64::from(remaining) / f64::from(total)).clamp(0.0, 100.0)
            }
        }
    }

    /// Read-model projection of the phase.
    #[must_use]
    pub fn view(&self) -> PhaseView {
        let label = match self.phase {
            Phase::Idle => None,
            Phase::Voting { remaining, .. } => Some(format!("Voting Time: {remaining} seconds")),
            Phase::Expired => Some("Voting Time: 0 seconds".to_string()),
        };
        PhaseView {
            phase: self.phase,
            percentage: self.percentage(),
            progress_visible: !matches!(self.phase, Phase::Idle),
            label,
        }
    }

    fn transition(&mut self, next: Phase, new_round: bool) -> Option<PhaseChange> {
        if next == self.phase && !new_round {
            return None;
        }
        let change = PhaseChange {
            from: self.phase,
            to: next,
            new_round,
        };
        debug!(from = %change.from, to = %change.to, new_round, "phase change");
        self.phase = next;
        Some(change)
    }
}
