//! `play` command handler
//!
//! Runs a [`SyncCore`] against the configured coordinator and turns the
//! terminal into its board: stdin lines become move attempts and reset
//! signals, read-model updates are printed to stdout.

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use crate::cli::args::{OutputFormat, PlayArgs};
use crate::config::{ClientConfig, ConfigLoader, LoaderOptions, Validator};
use crate::error::{ConfigError, MoveError, VoteChessError};
use crate::game::{Move, StandardRules};
use crate::observability::EventEmitter;
use crate::sync::{ReadModel, SyncCore, SyncHandle, SyncSettings};
use crate::transport::ws::WsConnector;

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    /// Coordinate move such as `e2e4` or `e7e8q`
    Move(Move),
    /// Back to the initial position
    Reset,
    /// Print the legal moves
    Moves,
    /// Print the full read model
    State,
    /// Leave the game
    Quit,
}

/// Parses a line of terminal input. Blank lines yield `None`.
///
/// # Errors
///
/// Returns a [`MoveError`] when the line is neither a keyword nor a
/// coordinate move.
pub fn parse_line(line: &str) -> Result<Option<LineCommand>, MoveError> {
    let line = line.trim();
    let command = match line.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "reset" => LineCommand::Reset,
        "moves" => LineCommand::Moves,
        "state" => LineCommand::State,
        "quit" | "exit" => LineCommand::Quit,
        other => LineCommand::Move(other.parse()?),
    };
    Ok(Some(command))
}

/// Start the client and relay moves until stdin closes or `cancel` fires.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded or the
/// command-line overrides are invalid, or an I/O error if the events
/// file or metrics endpoint cannot be opened.
pub async fn run(args: &PlayArgs, cancel: CancellationToken) -> Result<(), VoteChessError> {
    let config = resolve_config(args)?;

    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let emitter = match args.events_file.as_deref() {
        Some(path) if path == Path::new("-") => EventEmitter::stderr(),
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };

    let (core, handle) = SyncCore::new(
        SyncSettings::from_config(&config),
        Arc::new(StandardRules::new()),
        Arc::new(WsConnector::new()),
        Arc::new(emitter),
    );
    let core_task = tokio::spawn(core.run(cancel.clone()));
    let printer = tokio::spawn(print_updates(handle.clone(), args.format, cancel.clone()));

    let outcome = read_commands(&handle, args.format, &cancel).await;

    cancel.cancel();
    if let Err(err) = core_task.await {
        tracing::error!(error = %err, "sync core task failed");
    }
    if let Err(err) = printer.await {
        tracing::warn!(error = %err, "update printer failed");
    }
    outcome
}

/// Builds the effective configuration: file (or defaults) first, then
/// command-line overrides, validated again when any override applied.
fn resolve_config(args: &PlayArgs) -> Result<ClientConfig, VoteChessError> {
    let mut config = if let Some(ref path) = args.config {
        tracing::info!(config = %path.display(), "loading configuration");
        let loader = ConfigLoader::new(LoaderOptions::default());
        let load_result = loader.load(path)?;
        for warning in &load_result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }
        ClientConfig::clone(&load_result.config)
    } else {
        ClientConfig::default()
    };

    if apply_overrides(&mut config, args) {
        let validation = Validator::new().validate(&config);
        for warning in &validation.warnings {
            tracing::warn!(location = %warning.path, "{}", warning.message);
        }
        if validation.has_errors() {
            return Err(ConfigError::ValidationError {
                path: "command line".to_string(),
                errors: validation.errors,
            }
            .into());
        }
    }
    Ok(config)
}

/// Copies every flag that was given onto `config`. Returns whether
/// anything changed.
fn apply_overrides(config: &mut ClientConfig, args: &PlayArgs) -> bool {
    let mut changed = false;
    if let Some(ref url) = args.url {
        config.url.clone_from(url);
        changed = true;
    }
    if let Some(interval) = args.reconnect_interval_ms {
        config.reconnect_interval_ms = interval;
        changed = true;
    }
    if let Some(duration) = args.voting_duration {
        config.initial_voting_duration_seconds = duration;
        changed = true;
    }
    changed
}

async fn read_commands(
    handle: &SyncHandle,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<(), VoteChessError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed");
            return Ok(());
        };

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(LineCommand::Quit)) => return Ok(()),
            Ok(Some(LineCommand::Move(mv))) => match handle.attempt_move(mv).await {
                Ok(record) => println!("played {}", record.san),
                Err(MoveError::Unavailable) => return Ok(()),
                Err(err) => println!("rejected: {err}"),
            },
            Ok(Some(LineCommand::Reset)) => {
                if !handle.reset_game().await {
                    return Ok(());
                }
            }
            Ok(Some(LineCommand::Moves)) => {
                println!("{}", handle.snapshot().available_moves.join(" "));
            }
            Ok(Some(LineCommand::State)) => {
                println!("{}", render(&handle.snapshot(), format)?);
            }
            Err(err) => println!("unrecognized input: {err}"),
        }
    }
}

async fn print_updates(handle: SyncHandle, format: OutputFormat, cancel: CancellationToken) {
    let mut updates = WatchStream::from_changes(handle.subscribe());
    loop {
        let model = tokio::select! {
            () = cancel.cancelled() => break,
            model = updates.next() => match model {
                Some(model) => model,
                None => break,
            },
        };
        match render(&model, format) {
            Ok(text) => println!("{text}"),
            Err(err) => tracing::warn!(error = %err, "failed to render update"),
        }
    }
}

/// Renders a snapshot as one line of output.
///
/// # Errors
///
/// Returns a JSON error if the snapshot cannot be serialized.
pub fn render(model: &ReadModel, format: OutputFormat) -> Result<String, VoteChessError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(model)?),
        OutputFormat::Human => Ok(render_human(model)),
    }
}

fn render_human(model: &ReadModel) -> String {
    let mut line = format!("[{}]", model.connection_state);
    if let Some(ref label) = model.phase.label {
        line.push_str(&format!(" {label} ({:.0}%)", model.phase.percentage));
    }
    line.push_str(&format!(" moves: {}", model.history.len()));
    if let Some(san) = model.last_san() {
        line.push_str(&format!(" last: {san}"));
    }
    line.push_str(&format!(" fen: {}", model.position));
    line
}
