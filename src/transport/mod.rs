//! Socket transport layer.
//!
//! A [`Connector`] opens one socket per call. Each socket runs as its own
//! task and reports what happens to it as [`TransportEvent`]s on a shared
//! channel, tagged with the [`SocketId`] it was opened under. The owner
//! talks back through the returned [`SocketHandle`].
//!
//! Event order per socket is fixed: at most one `Opened`, any number of
//! data events and errors, and exactly one `Closed`, always last.

pub mod ws;

pub use ws::WsConnector;

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// Identity of one socket incarnation.
///
/// Ids only grow, so an event from a replaced socket can always be told
/// apart from one of the live socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketId(u64);

impl SocketId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened to a socket.
#[derive(Debug)]
pub enum TransportEvent {
    /// Handshake finished.
    Opened,
    /// Text frame received.
    Text(String),
    /// Binary frame received.
    Binary(Vec<u8>),
    /// Transport-level ping received.
    Ping(Vec<u8>),
    /// Transport failure. A `Closed` follows once the socket is gone.
    Error(TransportError),
    /// The socket is gone; nothing else follows for this id.
    Closed {
        /// Close reason, when the peer sent one
        reason: Option<String>,
    },
}

/// Frame written to a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Pong(Vec<u8>),
    Close,
}

/// Event on the sync core's input channel.
#[derive(Debug)]
pub enum LinkEvent {
    /// A socket reported something.
    Socket {
        socket: SocketId,
        event: TransportEvent,
    },
    /// A reconnect timer fired.
    RetryDue {
        /// Attempt number the timer was scheduled for
        attempt: u64,
    },
}

/// Sender half of the sync core's input channel.
pub type LinkSender = mpsc::UnboundedSender<LinkEvent>;

/// Opens sockets.
pub trait Connector: Send + Sync + fmt::Debug {
    /// Starts connecting to `url` and returns immediately.
    ///
    /// Progress is reported on `events` under `socket`. Must be called
    /// from within a tokio runtime.
    fn open(&self, url: &str, socket: SocketId, events: LinkSender) -> SocketHandle;
}

/// Owner's side of a socket.
///
/// Dropping the handle closes the socket and discards any frames not yet
/// written.
#[derive(Debug)]
pub struct SocketHandle {
    id: SocketId,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    cancel: CancellationToken,
}

impl SocketHandle {
    /// Id of the socket.
    #[must_use]
    pub const fn id(&self) -> SocketId {
        self.id
    }

    /// Queues a frame for writing.
    ///
    /// Returns `false` if the socket task has already finished.
    pub fn send(&self, frame: OutboundFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Closes the socket without flushing queued frames.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Socket task's side of a socket.
#[derive(Debug)]
pub struct SocketEndpoint {
    id: SocketId,
    events: LinkSender,
    /// Frames queued by the owner
    pub outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    /// Cancelled when the owner closes or drops the handle
    pub cancel: CancellationToken,
}

impl SocketEndpoint {
    /// Id of the socket.
    #[must_use]
    pub const fn id(&self) -> SocketId {
        self.id
    }

    /// Reports an event under this socket's id.
    ///
    /// Returns `false` once the receiving side is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events
            .send(LinkEvent::Socket {
                socket: self.id,
                event,
            })
            .is_ok()
    }
}

/// Creates the two ends of a socket.
#[must_use]
pub fn socket_pair(id: SocketId, events: LinkSender) -> (SocketHandle, SocketEndpoint) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    (
        SocketHandle {
            id,
            outbound: tx,
            cancel: cancel.clone(),
        },
        SocketEndpoint {
            id,
            events,
            outbound: rx,
            cancel,
        },
    )
}
