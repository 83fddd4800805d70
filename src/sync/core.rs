//! Composition root.
//!
//! [`SyncCore`] owns the game, the phase controller and the connection
//! manager, and is the only place any of them is mutated. Its event loop
//! takes link events and UI commands one at a time, in arrival order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::{ConnectionConfig, ConnectionEvent, ConnectionManager};
use crate::error::MoveError;
use crate::game::{GameState, Move, MoveRecord, MoveSource, PieceKind, RulesEngine, Square};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::phase::{Phase, PhaseChange, PhaseController};
use crate::protocol::{InboundFrame, OutboundIntent};
use crate::transport::{Connector, LinkEvent};

use super::handle::{Command, SyncHandle};
use super::read_model::ReadModel;

/// Capacity of the UI command queue.
const COMMAND_BUFFER: usize = 64;

/// Runtime settings for the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Coordinator endpoint
    pub url: String,
    pub reconnect_interval: Duration,
    /// Round total assumed when a round is first seen already expired
    pub initial_voting_duration_seconds: u32,
}

impl SyncSettings {
    /// Settings taken from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            url: config.url.clone(),
            reconnect_interval: Duration::from_millis(config.reconnect_interval_ms),
            initial_voting_duration_seconds: config.initial_voting_duration_seconds,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// The client-side synchronization core.
#[derive(Debug)]
pub struct SyncCore {
    url: String,
    game: GameState,
    phase: PhaseController,
    connection: ConnectionManager,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    command_rx: mpsc::Receiver<Command>,
    model_tx: watch::Sender<Arc<ReadModel>>,
    emitter: Arc<EventEmitter>,
}

impl SyncCore {
    /// Wires a core around `rules` and `connector`.
    ///
    /// Nothing connects until [`start`](Self::start) or
    /// [`run`](Self::run) is called.
    #[must_use]
    pub fn new(
        settings: SyncSettings,
        rules: Arc<dyn RulesEngine>,
        connector: Arc<dyn Connector>,
        emitter: Arc<EventEmitter>,
    ) -> (Self, SyncHandle) {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let connection = ConnectionManager::new(
            ConnectionConfig {
                reconnect_interval: settings.reconnect_interval,
            },
            connector,
            link_tx,
        );
        let game = GameState::new(rules);
        let phase = PhaseController::new(settings.initial_voting_duration_seconds);
        let initial = Arc::new(Self::snapshot_of(&game, &phase, &connection));
        let (model_tx, model_rx) = watch::channel(initial);

        let core = Self {
            url: settings.url,
            game,
            phase,
            connection,
            link_rx,
            command_rx,
            model_tx,
            emitter,
        };
        (core, SyncHandle::new(command_tx, model_rx))
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn read_model(&self) -> Arc<ReadModel> {
        self.model_tx.borrow().clone()
    }

    /// Opens the first connection.
    pub fn start(&mut self) {
        info!(url = %self.url, "sync core starting");
        self.emitter.emit(Event::ClientStarted {
            timestamp: Utc::now(),
            url: self.url.clone(),
        });
        metrics::set_phase(self.phase.phase(), None);
        self.connection.connect(&self.url);
        self.publish();
    }

    /// Runs the event loop until `cancel` fires, then shuts the
    /// connection down.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.start();
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                command = self.command_rx.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("all handles dropped");
                        commands_open = false;
                    }
                },
                Some(event) = self.link_rx.recv() => self.handle_link(event),
            }
        }

        self.stop("cancelled");
    }

    /// Shuts the connection down for good.
    pub fn stop(&mut self, reason: &str) {
        self.connection.shutdown();
        info!(reason, "sync core stopped");
        self.emitter.emit(Event::ClientStopped {
            timestamp: Utc::now(),
            reason: reason.to_owned(),
        });
        self.publish();
    }

    /// Applies one socket or timer event.
    pub fn handle_link(&mut self, event: LinkEvent) {
        if let Some(event) = self.connection.handle(event) {
            self.dispatch(event);
        }
    }

    /// Synchronous move callback: `true` when the move was accepted.
    pub fn on_user_move_attempt(&mut self, from: Square, to: Square) -> bool {
        self.attempt_move(from, to, None).is_ok()
    }

    /// Validates a local move, records it, and forwards its SAN to the
    /// coordinator.
    ///
    /// The intent is sent only if the connection is up; the move stays in
    /// the history either way.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Illegal`] when the rules engine rejects the
    /// move; nothing changes in that case.
    pub fn attempt_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<MoveRecord, MoveError> {
        let record = self
            .game
            .try_local_move(from, to, promotion)
            .inspect_err(|err| self.move_rejected(MoveSource::Local, Move::new(from, to), err))?;

        self.move_applied(&record);
        if !self.connection.send(&OutboundIntent::make_move(&record.san)) {
            debug!(san = %record.san, "move kept locally, not forwarded");
        }
        self.publish();
        Ok(record)
    }

    /// External reset signal: back to the initial position and `Idle`.
    pub fn reset_game(&mut self) {
        self.game.reset();
        let change = self.phase.reset();
        self.phase_changed(change);
        self.emitter.emit(Event::GameReset {
            timestamp: Utc::now(),
        });
        self.publish();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Move { mv, reply } => {
                let result = self.attempt_move(mv.from, mv.to, mv.promotion);
                let _ = reply.send(result);
            }
            Command::Reset => self.reset_game(),
        }
    }

    fn dispatch(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Reconnecting { .. } => self.publish(),
            ConnectionEvent::Connected { socket } => {
                self.emitter.emit(Event::ConnectionOpened {
                    timestamp: Utc::now(),
                    socket_id: socket.get(),
                });
                self.publish();
            }
            ConnectionEvent::Disconnected {
                socket,
                reason,
                retry,
            } => {
                self.emitter.emit(Event::ConnectionClosed {
                    timestamp: Utc::now(),
                    socket_id: socket.get(),
                    reason,
                });
                if let Some(plan) = retry {
                    self.emitter.emit(Event::ReconnectScheduled {
                        timestamp: Utc::now(),
                        attempt: plan.attempt,
                        delay_ms: u64::try_from(plan.delay.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                self.publish();
            }
            ConnectionEvent::Frame(frame) => {
                metrics::record_frame(frame.kind());
                self.on_frame(frame);
            }
            ConnectionEvent::Malformed(err) => {
                metrics::record_frame("malformed");
                self.emitter.emit(Event::FrameDropped {
                    timestamp: Utc::now(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn on_frame(&mut self, frame: InboundFrame) {
        match frame {
            InboundFrame::Voting { remaining } => {
                let change = self.phase.on_voting_frame(remaining);
                if self.phase_changed(change) {
                    self.publish();
                }
            }
            InboundFrame::OpponentMove {
                from,
                to,
                promotion,
            } => match self.game.apply_remote_move(from, to, promotion) {
                Ok(record) => {
                    self.move_applied(&record);
                    self.publish();
                }
                Err(err) => {
                    let attempted = Move::new(from, to).with_promotion(promotion);
                    self.move_rejected(MoveSource::Remote, attempted, &err);
                }
            },
            InboundFrame::Reset => {
                let change = self.phase.on_idle_frame();
                if self.phase_changed(change) {
                    self.publish();
                }
            }
        }
    }

    fn move_applied(&self, record: &MoveRecord) {
        metrics::record_move(record.source, true);
        self.emitter.emit(Event::MoveApplied {
            timestamp: Utc::now(),
            source: record.source,
            san: record.san.clone(),
            fen: record.resulting_position.fen().to_owned(),
        });
    }

    fn move_rejected(&self, source: MoveSource, attempted: Move, err: &MoveError) {
        metrics::record_move(source, false);
        if source == MoveSource::Remote {
            warn!(%attempted, error = %err, "remote move rejected");
        }
        self.emitter.emit(Event::MoveRejected {
            timestamp: Utc::now(),
            source,
            attempted: attempted.to_string(),
            reason: err.to_string(),
        });
    }

    /// Records a phase change; returns whether there was one.
    fn phase_changed(&self, change: Option<PhaseChange>) -> bool {
        let Some(change) = change else {
            return false;
        };
        metrics::set_phase(change.to, Some(change.from));
        let remaining = match change.to {
            Phase::Voting { remaining, .. } => Some(remaining),
            Phase::Expired => Some(0),
            Phase::Idle => None,
        };
        self.emitter.emit(Event::PhaseChanged {
            timestamp: Utc::now(),
            from: change.from.name().to_owned(),
            to: change.to.name().to_owned(),
            remaining,
        });
        true
    }

    fn publish(&self) {
        let model = Self::snapshot_of(&self.game, &self.phase, &self.connection);
        self.model_tx.send_replace(Arc::new(model));
    }

    fn snapshot_of(
        game: &GameState,
        phase: &PhaseController,
        connection: &ConnectionManager,
    ) -> ReadModel {
        ReadModel {
            position: game.position().clone(),
            history: game.history().to_vec(),
            connection_state: connection.state(),
            phase: phase.view(),
            available_moves: game.available_moves_san(),
            reconnect_attempts: connection.reconnect_attempts(),
        }
    }
}
