//! Coordinator wire protocol
//!
//! JSON text frames in both directions: [`frames`] classifies what the
//! server pushes, [`intent`] encodes what the client asks for.

pub mod frames;
pub mod intent;

pub use frames::{InboundFrame, parse_binary_frame, parse_frame};
pub use intent::OutboundIntent;
