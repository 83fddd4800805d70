//! Logging setup.
//!
//! Everything goes to stderr so stdout stays free for the read-model feed
//! printed by `play`.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding an `EnvFilter` directive. Wins over `-v`.
pub const LOG_LEVEL_ENV: &str = "VOTECHESS_LOG_LEVEL";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

/// Default filter for a `-v` count: none is `warn`, then `info`, `debug`,
/// and `trace` from three on.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Whether human output should carry ANSI escapes.
fn ansi_enabled(color: ColorChoice, stderr_is_terminal: bool) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => stderr_is_terminal && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Installs the global subscriber.
///
/// Later calls are ignored, so tests may call this freely.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));
    // Module paths only help once debugging is on
    let with_target = verbosity >= 2;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(with_target)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder
            .with_ansi(ansi_enabled(color, std::io::stderr().is_terminal()))
            .try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_saturates_at_trace() {
        let directives: Vec<_> = (0..=5).map(verbosity_to_directive).collect();
        assert_eq!(
            directives,
            ["warn", "info", "debug", "trace", "trace", "trace"]
        );
    }

    #[test]
    fn explicit_color_choice_ignores_terminal() {
        assert!(ansi_enabled(ColorChoice::Always, false));
        assert!(!ansi_enabled(ColorChoice::Never, true));
        assert!(!ansi_enabled(ColorChoice::Auto, false));
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LogFormat::Human, 0, ColorChoice::Never);
        init_logging(LogFormat::Json, 3, ColorChoice::Never);
    }
}
