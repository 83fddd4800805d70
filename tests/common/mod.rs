//! Shared integration-test harness: an in-memory connector, a local
//! WebSocket coordinator, and a wrapper around the `votechess` binary.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use votechess::game::StandardRules;
use votechess::observability::EventEmitter;
use votechess::sync::{ReadModel, SyncCore, SyncHandle, SyncSettings};
use votechess::transport::{
    Connector, LinkSender, SocketEndpoint, SocketHandle, SocketId, socket_pair,
};

/// Default timeout for anything a test waits on.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Scripted connector
// ============================================================================

/// A socket opened through [`ScriptedConnector`].
#[derive(Debug)]
pub struct OpenedSocket {
    pub url: String,
    pub endpoint: SocketEndpoint,
}

/// Connector whose sockets are driven by the test.
///
/// Every `open` hands the socket task's side to the test through a
/// channel; the test then plays the transport by emitting events on it.
#[derive(Debug)]
pub struct ScriptedConnector {
    opened: mpsc::UnboundedSender<OpenedSocket>,
}

impl ScriptedConnector {
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OpenedSocket>) {
        let (opened, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { opened }), rx)
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, url: &str, socket: SocketId, events: LinkSender) -> SocketHandle {
        let (handle, endpoint) = socket_pair(socket, events);
        let _ = self.opened.send(OpenedSocket {
            url: url.to_owned(),
            endpoint,
        });
        handle
    }
}

/// Waits for the next socket the core opens.
#[allow(clippy::missing_panics_doc)]
pub async fn next_socket(opened: &mut mpsc::UnboundedReceiver<OpenedSocket>) -> OpenedSocket {
    tokio::time::timeout(DEFAULT_TIMEOUT, opened.recv())
        .await
        .expect("timed out waiting for the core to open a socket")
        .expect("connector dropped")
}

/// Builds a core with standard rules and a silent event sink.
#[must_use]
pub fn core_with(
    settings: SyncSettings,
    connector: Arc<dyn Connector>,
) -> (SyncCore, SyncHandle) {
    SyncCore::new(
        settings,
        Arc::new(StandardRules::new()),
        connector,
        Arc::new(EventEmitter::noop()),
    )
}

/// Waits until the published read model satisfies `pred`.
#[allow(clippy::missing_panics_doc)]
pub async fn wait_for_model(
    handle: &SyncHandle,
    mut pred: impl FnMut(&ReadModel) -> bool,
) -> Arc<ReadModel> {
    let mut updates = handle.subscribe();
    let model = tokio::time::timeout(
        DEFAULT_TIMEOUT,
        updates.wait_for(|model| pred(model.as_ref())),
    )
    .await
    .expect("timed out waiting for read model")
    .expect("sync core dropped");
    Arc::clone(&model)
}

// ============================================================================
// Mock coordinator
// ============================================================================

/// Server side of one accepted WebSocket.
pub type ServerSocket = WebSocketStream<TcpStream>;

/// A WebSocket server on an ephemeral local port.
pub struct MockCoordinator {
    addr: SocketAddr,
    accepted: mpsc::UnboundedReceiver<ServerSocket>,
}

impl MockCoordinator {
    /// Binds `127.0.0.1:0` and accepts sockets in the background.
    #[allow(clippy::missing_panics_doc)]
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock coordinator");
        let addr = listener.local_addr().expect("no local addr");
        let (tx, accepted) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => {
                        if tx.send(ws).is_err() {
                            break;
                        }
                    }
                    Err(err) => eprintln!("mock coordinator handshake failed: {err}"),
                }
            }
        });

        Self { addr, accepted }
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Waits for the next client to connect.
    #[allow(clippy::missing_panics_doc)]
    pub async fn accept(&mut self) -> ServerSocket {
        tokio::time::timeout(DEFAULT_TIMEOUT, self.accepted.recv())
            .await
            .expect("timed out waiting for a client")
            .expect("accept loop stopped")
    }
}

/// Sends a text frame to the client.
#[allow(clippy::missing_panics_doc)]
pub async fn send_text(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::Text(text.into()))
        .await
        .expect("failed to send frame");
}

/// Reads the next frame, whatever it is.
#[allow(clippy::missing_panics_doc)]
pub async fn next_frame(ws: &mut ServerSocket) -> Message {
    next_matching(ws, |_| true).await
}

/// Reads frames until one satisfies `pred`.
#[allow(clippy::missing_panics_doc)]
pub async fn next_matching(
    ws: &mut ServerSocket,
    mut pred: impl FnMut(&Message) -> bool,
) -> Message {
    tokio::time::timeout(DEFAULT_TIMEOUT, async {
        loop {
            let msg = ws
                .next()
                .await
                .expect("client went away")
                .expect("websocket error");
            if pred(&msg) {
                return msg;
            }
        }
    })
    .await
    .expect("timed out waiting for a frame")
}

/// Reads the next text frame, skipping control frames.
#[allow(clippy::missing_panics_doc)]
pub async fn next_text(ws: &mut ServerSocket) -> String {
    match next_matching(ws, Message::is_text).await {
        Message::Text(text) => text.to_string(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

// ============================================================================
// Binary process
// ============================================================================

/// A running `votechess play` process.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
pub struct VoteChessProcess {
    child: Child,
    stdin: tokio::process::ChildStdin,
    reader: BufReader<tokio::process::ChildStdout>,
}

impl VoteChessProcess {
    /// Spawns `votechess play` with the given extra arguments.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_play(args: &[&str]) -> Self {
        let bin = env!("CARGO_BIN_EXE_votechess");
        let mut child = Command::new(bin)
            .arg("--quiet")
            .arg("play")
            .args(args)
            .env_remove("VOTECHESS_CONFIG")
            .env_remove("VOTECHESS_URL")
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn votechess");

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
        }
    }

    /// Writes one line to stdin.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send_line(&mut self, line: &str) {
        self.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("failed to write to stdin");
        self.stdin.flush().await.expect("failed to flush stdin");
    }

    /// Reads stdout lines until one satisfies `pred`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_until(&mut self, mut pred: impl FnMut(&str) -> bool) -> String {
        tokio::time::timeout(DEFAULT_TIMEOUT, async {
            let mut line = String::new();
            loop {
                line.clear();
                let n = self
                    .reader
                    .read_line(&mut line)
                    .await
                    .expect("read_line I/O error");
                assert!(n > 0, "unexpected EOF from votechess");
                if pred(line.trim()) {
                    return line.trim().to_string();
                }
            }
        })
        .await
        .expect("timed out waiting for output")
    }

    /// Closes stdin and waits for the process to exit.
    #[allow(clippy::missing_panics_doc)]
    pub async fn shutdown(self) -> std::process::ExitStatus {
        let Self {
            mut child, stdin, ..
        } = self;
        drop(stdin);

        match tokio::time::timeout(DEFAULT_TIMEOUT, child.wait()).await {
            Ok(status) => status.expect("failed to wait for child"),
            Err(_) => {
                child.kill().await.expect("failed to kill child");
                panic!("votechess did not exit after stdin closed");
            }
        }
    }

    /// Runs a non-interactive command to completion.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> std::process::Output {
        std::process::Command::new(env!("CARGO_BIN_EXE_votechess"))
            .args(args)
            .output()
            .expect("failed to run votechess")
    }

    /// Returns the path to a test fixture.
    #[must_use]
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[must_use]
    pub fn fixture_str(name: &str) -> String {
        Self::fixture_path(name)
            .to_str()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| panic!("non-UTF-8 fixture path for {name}"))
    }
}

/// Reads a fixture's raw text.
#[allow(clippy::missing_panics_doc)]
pub fn fixture_text(path: &Path) -> String {
    std::fs::read_to_string(path).expect("failed to read fixture")
}
