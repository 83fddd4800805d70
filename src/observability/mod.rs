//! Observability module
//!
//! Logging, metrics, and structured event infrastructure for watching the
//! sync core at work.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter};
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
