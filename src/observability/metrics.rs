//! Metrics collection.
//!
//! Prometheus-compatible metrics with typed recording helpers. Every
//! label value comes from a fixed enum inside the crate, never from wire
//! input, so label cardinality stays bounded.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::connection::ConnectionState;
use crate::error::VoteChessError;
use crate::game::MoveSource;
use crate::phase::Phase;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns [`VoteChessError::Metrics`] if the recorder or listener cannot
/// be installed, for instance when the port is taken.
pub fn init_metrics(port: Option<u16>) -> Result<(), VoteChessError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| VoteChessError::Metrics(e.to_string()))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "votechess_frames_total",
        "Inbound frames by classification"
    );
    describe_counter!(
        "votechess_moves_total",
        "Move attempts by source and outcome"
    );
    describe_counter!(
        "votechess_reconnect_attempts_total",
        "Reconnect attempts made after a close"
    );
    describe_gauge!(
        "votechess_connection_state",
        "0 = disconnected, 1 = connecting, 2 = connected"
    );
    describe_gauge!(
        "votechess_vote_seconds_remaining",
        "Seconds left in the current vote, 0 outside a vote"
    );
    describe_gauge!(
        "votechess_current_phase",
        "Currently active vote phase (1 = active)"
    );
}

/// Records a classified inbound frame; `"malformed"` for dropped frames.
pub fn record_frame(kind: &'static str) {
    counter!("votechess_frames_total", "kind" => kind).increment(1);
}

/// Records the outcome of a move attempt.
pub fn record_move(source: MoveSource, applied: bool) {
    let outcome = if applied { "applied" } else { "rejected" };
    counter!(
        "votechess_moves_total",
        "source" => source.as_str(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Records one reconnect attempt.
pub fn record_reconnect_attempt() {
    counter!("votechess_reconnect_attempts_total").increment(1);
}

/// Sets the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!("votechess_connection_state").set(state.gauge_value());
}

/// Sets the phase gauges.
///
/// Zeros the previous phase label before raising the new one so stale
/// labels never read `1.0`.
pub fn set_phase(phase: Phase, previous: Option<Phase>) {
    if let Some(prev) = previous {
        gauge!("votechess_current_phase", "phase" => prev.name()).set(0.0);
    }
    gauge!("votechess_current_phase", "phase" => phase.name()).set(1.0);

    let remaining = match phase {
        Phase::Voting { remaining, .. } => f64::from(remaining),
        Phase::Idle | Phase::Expired => 0.0,
    };
    gauge!("votechess_vote_seconds_remaining").set(remaining);
}
