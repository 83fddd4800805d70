//! CLI argument definitions
//!
//! All Clap derive structs for `votechess` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Live client for chat-voted chess games.
#[derive(Parser, Debug)]
#[command(name = "votechess", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "VOTECHESS_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true, env = "VOTECHESS_LOG_FORMAT")]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Join a game and relay moves between the terminal and the coordinator.
    Play(PlayArgs),

    /// Check configuration files without connecting.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Play / Validate
// ============================================================================

/// Arguments for `play`.
///
/// Every flag overrides the matching field of the configuration file.
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Path to a YAML configuration file.
    #[arg(short, long, env = "VOTECHESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Coordinator WebSocket URL.
    #[arg(short, long, env = "VOTECHESS_URL")]
    pub url: Option<String>,

    /// Delay before each reconnect attempt, in milliseconds.
    #[arg(long, env = "VOTECHESS_RECONNECT_INTERVAL_MS")]
    pub reconnect_interval_ms: Option<u64>,

    /// Round length assumed when a round is first seen already expired.
    #[arg(long, env = "VOTECHESS_VOTING_DURATION")]
    pub voting_duration: Option<u32>,

    /// Write JSONL events to this file.
    #[arg(long, env = "VOTECHESS_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "VOTECHESS_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Output format for read-model updates.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormat> for LogFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => Self::Human,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn play_args(cli: Cli) -> PlayArgs {
        match cli.command {
            Commands::Play(args) => args,
            other => panic!("Expected PlayArgs, got {other:?}"),
        }
    }

    #[test]
    fn test_play_without_flags() {
        let cli = Cli::try_parse_from(["votechess", "play"]).unwrap();
        let args = play_args(cli);
        assert!(args.config.is_none());
        assert!(args.url.is_none());
        assert_eq!(args.format, OutputFormat::Human);
    }

    #[test]
    fn test_play_overrides() {
        let cli = Cli::try_parse_from([
            "votechess",
            "play",
            "--config",
            "client.yaml",
            "--url",
            "wss://chess.example/ws",
            "--reconnect-interval-ms",
            "250",
            "--voting-duration",
            "30",
            "--metrics-port",
            "9100",
        ])
        .unwrap();
        let args = play_args(cli);
        assert_eq!(args.config, Some(PathBuf::from("client.yaml")));
        assert_eq!(args.url.as_deref(), Some("wss://chess.example/ws"));
        assert_eq!(args.reconnect_interval_ms, Some(250));
        assert_eq!(args.voting_duration, Some(30));
        assert_eq!(args.metrics_port, Some(9100));
    }

    #[test]
    fn test_play_rejects_non_numeric_interval() {
        let result =
            Cli::try_parse_from(["votechess", "play", "--reconnect-interval-ms", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["votechess", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let err = Cli::try_parse_from(["votechess", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_validate_requires_files() {
        let result = Cli::try_parse_from(["votechess", "validate"]);
        assert!(result.is_err(), "Expected error for missing files");
    }

    #[test]
    fn test_color_choices_parse() {
        for variant in ["auto", "always", "never"] {
            let cli = Cli::try_parse_from(["votechess", "--color", variant, "play"]);
            assert!(cli.is_ok(), "Failed to parse color={variant}");
        }
    }

    #[test]
    fn test_log_format_is_global() {
        let cli = Cli::try_parse_from(["votechess", "play", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, OutputFormat::Json);
        assert_eq!(LogFormat::from(cli.log_format), LogFormat::Json);
    }

    #[test]
    fn test_completions_shells_parse() {
        for shell in ["bash", "zsh", "fish", "powershell", "elvish"] {
            let cli = Cli::try_parse_from(["votechess", "completions", shell]);
            assert!(cli.is_ok(), "Failed to parse shell={shell}");
        }
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["votechess", "-vvv", "play"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn quiet_flag() {
        let cli = Cli::try_parse_from(["votechess", "--quiet", "play"]).unwrap();
        assert!(cli.quiet);
    }
}
