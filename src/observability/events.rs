//! Structured event stream.
//!
//! Discrete, typed events emitted while the client runs. Events are
//! serialized as newline-delimited JSON and carry a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::game::MoveSource;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during client operation.
///
/// Serialized with a `"type"` tag so consumers can dispatch on the kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The sync core started.
    ClientStarted {
        timestamp: DateTime<Utc>,
        /// Coordinator endpoint
        url: String,
    },

    /// The sync core stopped.
    ClientStopped {
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason
        reason: String,
    },

    /// A socket finished its handshake.
    ConnectionOpened {
        timestamp: DateTime<Utc>,
        socket_id: u64,
    },

    /// The live socket went away.
    ConnectionClosed {
        timestamp: DateTime<Utc>,
        socket_id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A reconnect attempt was scheduled.
    ReconnectScheduled {
        timestamp: DateTime<Utc>,
        /// One-based attempt number
        attempt: u64,
        delay_ms: u64,
    },

    /// An inbound frame was malformed and discarded.
    FrameDropped {
        timestamp: DateTime<Utc>,
        reason: String,
    },

    /// A move entered the history.
    MoveApplied {
        timestamp: DateTime<Utc>,
        source: MoveSource,
        san: String,
        /// Position after the move
        fen: String,
    },

    /// The rules engine refused a move.
    MoveRejected {
        timestamp: DateTime<Utc>,
        source: MoveSource,
        /// Coordinate notation of the attempted move
        attempted: String,
        reason: String,
    },

    /// The vote phase changed.
    PhaseChanged {
        timestamp: DateTime<Utc>,
        from: String,
        to: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining: Option<u32>,
    },

    /// Position and history returned to the start.
    GameReset { timestamp: DateTime<Utc> },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each [`emit`](Self::emit) increments the sequence counter, writes one
/// JSON line and flushes. Serialization or I/O failures are dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    ///
    /// Stdout is reserved for the read-model feed of `play`.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
