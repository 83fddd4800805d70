//! Connection lifecycle state machine.
//!
//! The manager owns at most one socket at a time and never blocks: the
//! owner feeds it [`LinkEvent`]s from the shared channel and acts on the
//! [`ConnectionEvent`]s it hands back. Reconnects use a fixed interval and
//! never give up.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::ProtocolError;
use crate::observability::metrics;
use crate::protocol::{InboundFrame, OutboundIntent, parse_binary_frame, parse_frame};
use crate::transport::{
    Connector, LinkEvent, LinkSender, OutboundFrame, SocketHandle, SocketId, TransportEvent,
};

use super::retry::ScheduledRetry;

/// Payload of the pong sent in answer to a transport ping.
const PONG_PAYLOAD: &[u8] = b"pong";

/// Default delay between a close and the next connect.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// State
// ============================================================================

/// Lifecycle state of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Label used in logs and output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Numeric encoding for the state gauge.
    #[must_use]
    pub const fn gauge_value(self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Connecting => 1.0,
            Self::Connected => 2.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Delay between a close and the reconnect it triggers
    pub reconnect_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

/// A reconnect that has been scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPlan {
    /// Timer sequence number, unique per scheduled retry
    pub attempt: u64,
    pub delay: Duration,
}

/// What the owner needs to react to.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A reconnect timer fired and a new socket is being opened.
    Reconnecting { socket: SocketId, attempt: u64 },
    /// The socket finished its handshake.
    Connected { socket: SocketId },
    /// The socket went away.
    Disconnected {
        socket: SocketId,
        reason: Option<String>,
        /// The reconnect scheduled in response, absent after shutdown
        retry: Option<RetryPlan>,
    },
    /// A well-formed inbound frame.
    Frame(InboundFrame),
    /// An inbound frame that was dropped.
    Malformed(ProtocolError),
}

// ============================================================================
// Manager
// ============================================================================

/// Owns the one logical connection to the coordinator.
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    events: LinkSender,
    url: Option<String>,
    state: ConnectionState,
    socket: Option<SocketHandle>,
    sockets_opened: u64,
    retry: Option<ScheduledRetry>,
    retries_scheduled: u64,
    reconnect_attempts: u64,
    shut_down: bool,
}

impl ConnectionManager {
    /// Creates a disconnected manager.
    ///
    /// Socket and timer events are posted on `events`; the receiving end
    /// must feed them back through [`handle`](Self::handle).
    #[must_use]
    pub fn new(config: ConnectionConfig, connector: Arc<dyn Connector>, events: LinkSender) -> Self {
        Self {
            config,
            connector,
            events,
            url: None,
            state: ConnectionState::Disconnected,
            socket: None,
            sockets_opened: 0,
            retry: None,
            retries_scheduled: 0,
            reconnect_attempts: 0,
            shut_down: false,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnects made so far.
    #[must_use]
    pub const fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts
    }

    /// Id of the live socket, if any.
    #[must_use]
    pub fn socket_id(&self) -> Option<SocketId> {
        self.socket.as_ref().map(SocketHandle::id)
    }

    /// Whether a reconnect timer is pending.
    #[must_use]
    pub const fn retry_pending(&self) -> bool {
        self.retry.is_some()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Opens a connection to `url` unless one is already up or underway.
    ///
    /// A pending reconnect timer is replaced by the immediate connect.
    /// Returns whether a socket was opened.
    pub fn connect(&mut self, url: &str) -> bool {
        if self.shut_down {
            debug!("connect refused after shutdown");
            return false;
        }
        if self.state != ConnectionState::Disconnected {
            debug!(state = %self.state, "connect ignored");
            return false;
        }
        self.url = Some(url.to_owned());
        self.retry = None;
        self.open_socket(url);
        true
    }

    /// Applies one event from the shared channel.
    pub fn handle(&mut self, event: LinkEvent) -> Option<ConnectionEvent> {
        match event {
            LinkEvent::RetryDue { attempt } => self.on_retry_due(attempt),
            LinkEvent::Socket { socket, event } => {
                if self.socket_id() != Some(socket) {
                    debug!(socket_id = %socket, ?event, "ignoring event from stale socket");
                    return None;
                }
                self.on_socket_event(socket, event)
            }
        }
    }

    /// Sends an intent on the live socket.
    ///
    /// Dropped without error when not connected. Returns whether the frame
    /// was handed to the socket.
    pub fn send(&self, intent: &OutboundIntent) -> bool {
        let Some(socket) = self.socket.as_ref().filter(|_| self.state == ConnectionState::Connected)
        else {
            debug!(san = intent.san(), state = %self.state, "not connected, intent dropped");
            return false;
        };
        match intent.to_wire() {
            Ok(wire) => socket.send(OutboundFrame::Text(wire)),
            Err(err) => {
                warn!(error = %err, "failed to encode intent");
                false
            }
        }
    }

    /// Cancels any pending reconnect, closes the socket and refuses all
    /// further connects.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(retry) = self.retry.take() {
            retry.cancel();
        }
        if let Some(socket) = self.socket.take() {
            info!(socket_id = %socket.id(), "closing connection");
            socket.close();
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn on_retry_due(&mut self, attempt: u64) -> Option<ConnectionEvent> {
        if self.retry.as_ref().map(ScheduledRetry::attempt) != Some(attempt) {
            debug!(attempt, "ignoring stale reconnect timer");
            return None;
        }
        self.retry = None;
        if self.shut_down || self.state != ConnectionState::Disconnected {
            return None;
        }
        let url = self.url.clone()?;

        self.reconnect_attempts += 1;
        metrics::record_reconnect_attempt();
        info!(attempt, total = self.reconnect_attempts, "reconnecting");
        let socket = self.open_socket(&url);
        Some(ConnectionEvent::Reconnecting { socket, attempt })
    }

    fn on_socket_event(&mut self, socket: SocketId, event: TransportEvent) -> Option<ConnectionEvent> {
        match event {
            TransportEvent::Opened => {
                info!(socket_id = %socket, "connected");
                self.set_state(ConnectionState::Connected);
                Some(ConnectionEvent::Connected { socket })
            }
            TransportEvent::Text(text) => Some(Self::classify(parse_frame(&text))),
            TransportEvent::Binary(bytes) => Some(Self::classify(parse_binary_frame(&bytes))),
            TransportEvent::Ping(_) => {
                trace!(socket_id = %socket, "ping");
                if let Some(handle) = &self.socket {
                    handle.send(OutboundFrame::Pong(PONG_PAYLOAD.to_vec()));
                }
                None
            }
            TransportEvent::Error(err) => {
                warn!(socket_id = %socket, error = %err, "transport error, closing socket");
                if let Some(handle) = &self.socket {
                    handle.close();
                }
                None
            }
            TransportEvent::Closed { reason } => {
                self.socket = None;
                self.set_state(ConnectionState::Disconnected);
                info!(socket_id = %socket, ?reason, "disconnected");
                let retry = (!self.shut_down).then(|| self.schedule_retry());
                Some(ConnectionEvent::Disconnected {
                    socket,
                    reason,
                    retry,
                })
            }
        }
    }

    fn classify(parsed: Result<InboundFrame, ProtocolError>) -> ConnectionEvent {
        match parsed {
            Ok(frame) => ConnectionEvent::Frame(frame),
            Err(err) => {
                warn!(error = %err, "dropping malformed frame");
                ConnectionEvent::Malformed(err)
            }
        }
    }

    fn open_socket(&mut self, url: &str) -> SocketId {
        self.sockets_opened += 1;
        let id = SocketId::new(self.sockets_opened);
        info!(socket_id = %id, url, "opening connection");
        self.socket = Some(self.connector.open(url, id, self.events.clone()));
        self.set_state(ConnectionState::Connecting);
        id
    }

    fn schedule_retry(&mut self) -> RetryPlan {
        self.retries_scheduled += 1;
        let plan = RetryPlan {
            attempt: self.retries_scheduled,
            delay: self.config.reconnect_interval,
        };
        debug!(attempt = plan.attempt, delay_ms = plan.delay.as_millis(), "reconnect scheduled");
        self.retry = Some(ScheduledRetry::spawn(
            plan.attempt,
            plan.delay,
            self.events.clone(),
        ));
        plan
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        metrics::set_connection_state(state);
    }
}
