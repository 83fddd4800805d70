//! Vote phase tracking
//!
//! Derives the countdown display from the server's voting frames.
//!
//! - [`state`]: [`Phase`], [`PhaseChange`] and the [`PhaseView`] projection
//! - [`controller`]: [`PhaseController`], the reactive state machine

pub mod controller;
pub mod state;

pub use controller::PhaseController;
pub use state::{Phase, PhaseChange, PhaseView};
