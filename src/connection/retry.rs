//! Fixed-interval reconnect timer.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::transport::{LinkEvent, LinkSender};

/// A reconnect scheduled to fire once after a delay.
///
/// The timer runs as a detached task that posts
/// [`LinkEvent::RetryDue`] when it fires. Cancelling or dropping the
/// value stops it from firing.
#[derive(Debug)]
pub struct ScheduledRetry {
    attempt: u64,
    cancel: CancellationToken,
}

impl ScheduledRetry {
    /// Spawns the timer task. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(attempt: u64, delay: Duration, events: LinkSender) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    trace!(attempt, "reconnect timer cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    let _ = events.send(LinkEvent::RetryDue { attempt });
                }
            }
        });
        Self { attempt, cancel }
    }

    /// Attempt number this timer was scheduled for.
    #[must_use]
    pub const fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Stops the timer if it has not fired yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ScheduledRetry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
