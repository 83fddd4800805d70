//! `validate` command handler

use crate::cli::args::ValidateArgs;
use crate::config::{ConfigLoader, LoadResult, LoaderOptions};
use crate::error::{ConfigError, Severity, ValidationIssue, VoteChessError};

/// Validate configuration files without connecting.
///
/// Files are checked in order and the first failure stops the run.
///
/// # Errors
///
/// Returns an I/O error if a file does not exist, or a config error if
/// it fails to load or validate. With `--strict`, warnings count as
/// validation errors.
pub fn run(args: &ValidateArgs) -> Result<(), VoteChessError> {
    let loader = ConfigLoader::new(LoaderOptions::default());

    for path in &args.files {
        if !path.exists() {
            return Err(VoteChessError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        tracing::info!(file = %path.display(), "validating configuration");

        let load_result = loader.load(path)?;
        for warning in &load_result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }

        if args.strict && !load_result.warnings.is_empty() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: promote_warnings(&load_result),
            }
            .into());
        }

        tracing::info!(file = %path.display(), "configuration valid");
        println!("{}: ok", path.display());
    }

    Ok(())
}

fn promote_warnings(load_result: &LoadResult) -> Vec<ValidationIssue> {
    load_result
        .warnings
        .iter()
        .map(|warning| ValidationIssue {
            path: warning.location.clone().unwrap_or_default(),
            message: warning.message.clone(),
            severity: Severity::Error,
        })
        .collect()
}
