//! Connection lifecycle
//!
//! One logical connection to the coordinator, rebuilt on every close.
//!
//! - [`manager`]: [`ConnectionManager`] and its state machine
//! - [`retry`]: the cancellable fixed-interval reconnect timer

pub mod manager;
pub mod retry;

pub use manager::{
    ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState,
    DEFAULT_RECONNECT_INTERVAL, RetryPlan,
};
pub use retry::ScheduledRetry;
