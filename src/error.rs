//! Error types for `votechess`
//!
//! Domain errors stay local to the layer that raises them. Only what can
//! end a CLI run is folded into [`VoteChessError`], which picks the
//! process exit code.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Process exit codes.
pub struct ExitCode;

impl ExitCode {
    pub const SUCCESS: i32 = 0;

    /// Anything without a more specific code
    pub const ERROR: i32 = 1;

    /// Configuration could not be loaded or failed validation
    pub const CONFIG_ERROR: i32 = 2;

    /// A file or stream could not be read or written
    pub const IO_ERROR: i32 = 3;

    /// First SIGINT was followed by a second one
    pub const INTERRUPTED: i32 = 130;

    /// First signal was followed by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Failure of a CLI command.
#[derive(Debug, Error)]
pub enum VoteChessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Prometheus recorder or listener could not be installed
    #[error("metrics setup failed: {0}")]
    Metrics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read-model snapshot could not be rendered
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoteChessError {
    /// Exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Metrics(_) | Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Why a configuration file was refused.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Not YAML, or YAML that does not fit [`ClientConfig`](crate::config::ClientConfig)
    #[error("parse error in {path}: {message}")]
    ParseError {
        path: PathBuf,
        /// 1-based line, when the YAML parser reported one
        line: Option<usize>,
        message: String,
    },

    /// The document parsed but at least one field is unusable
    #[error("validation failed for {path}")]
    ValidationError {
        /// File path, or `"command line"` for flag overrides
        path: String,
        errors: Vec<ValidationIssue>,
    },

    #[error("file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    /// `${VAR:?message}` with `VAR` unset
    #[error("environment variable '{var}' not set ({location})")]
    EnvVarNotSet {
        var: String,
        /// The message given after `:?`
        location: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// One problem found by the config [`Validator`](crate::config::Validator).
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Config key the issue is about, e.g. `reconnect_interval_ms`
    pub path: String,
    pub message: String,
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}: {} ({})", self.message, self.path)
    }
}

/// How bad a [`ValidationIssue`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The configuration is refused
    Error,
    /// Logged; the configuration is still used
    Warning,
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Socket-level failures.
///
/// These never leave the connection manager: any of them forces the
/// socket closed and the reconnect path takes over.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Handshake or TCP connect did not succeed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Protocol violation reported by the peer or the codec
    #[error("websocket error: {0}")]
    WebSocket(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

// ============================================================================
// Protocol Errors
// ============================================================================

/// An inbound frame that does not match any expected shape.
///
/// Malformed frames are logged and dropped; they never change connection
/// or game state.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON frame: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,

    /// Voting frame without a usable `timer`
    #[error("voting frame has invalid timer: {0}")]
    InvalidTimer(String),

    #[error("move frame has invalid square: {0}")]
    InvalidSquare(String),

    #[error("move frame has invalid promotion: {0}")]
    InvalidPromotion(String),
}

// ============================================================================
// Move Errors
// ============================================================================

/// Why a move was not applied. Used for local and remote moves alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The rules engine rejected the move in the current position
    #[error("illegal move {0}")]
    Illegal(String),

    /// Text that does not name one of the 64 squares
    #[error("invalid square '{0}'")]
    InvalidSquare(String),

    /// Promotion letter other than q, r, b or n
    #[error("invalid promotion piece '{0}'")]
    InvalidPromotion(String),

    /// The sync core is no longer running
    #[error("sync core has stopped")]
    Unavailable,
}
