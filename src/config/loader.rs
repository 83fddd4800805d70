//! Configuration loader
//!
//! A file goes through these steps, in order:
//! 1. size check, then UTF-8 BOM stripping
//! 2. `${VAR}` expansion on the raw text, so expanded numbers stay numbers
//! 3. YAML parsing into [`ClientConfig`]
//! 4. validation
//!
//! The result is frozen in an `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::schema::ClientConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Size limit applied when `VOTECHESS_MAX_CONFIG_SIZE` is unset.
const DEFAULT_MAX_CONFIG_SIZE: usize = 1024 * 1024;

/// Loader tuning.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Files larger than this many bytes are refused
    pub max_config_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: std::env::var("VOTECHESS_MAX_CONFIG_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONFIG_SIZE),
        }
    }
}

/// A loaded configuration plus everything worth telling the user about it.
#[derive(Debug)]
pub struct LoadResult {
    pub config: Arc<ClientConfig>,
    pub warnings: Vec<LoadWarning>,
}

/// Non-fatal finding from expansion or validation.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    pub message: String,
    /// Config key or file the warning is about
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({location})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Reads client configuration files.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads, validates and freezes a configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing, unreadable or over the size limit,
    /// when a `${VAR:?message}` variable is unset, when the YAML does not
    /// fit the schema, or when validation reports an error.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let missing = || ConfigError::MissingFile {
            path: path.to_path_buf(),
        };
        let size = std::fs::metadata(path).map_err(|_| missing())?.len();
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        if size > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{size} bytes"),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|_| missing())?;
        self.load_str(&text, path)
    }

    /// Same as [`load`](Self::load) for text already in memory. `source`
    /// only appears in messages.
    ///
    /// # Errors
    ///
    /// As for [`load`](Self::load), minus the file checks.
    pub fn load_str(&self, text: &str, source: &Path) -> Result<LoadResult, ConfigError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let (expanded, mut warnings) = expand_env(text, source)?;

        let parse_error = |line: Option<usize>, message: String| ConfigError::ParseError {
            path: source.to_path_buf(),
            line,
            message,
        };

        let document: serde_yaml::Value = serde_yaml::from_str(&expanded)
            .map_err(|e| parse_error(e.location().map(|l| l.line()), e.to_string()))?;
        if document.is_null() {
            return Err(parse_error(None, "configuration file is empty".to_string()));
        }
        let config: ClientConfig = serde_yaml::from_value(document)
            .map_err(|e| parse_error(None, format!("does not match the schema: {e}")))?;

        let validation = Validator::new().validate(&config);
        if validation.has_errors() {
            return Err(ConfigError::ValidationError {
                path: source.display().to_string(),
                errors: validation.errors,
            });
        }
        warnings.extend(validation.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment expansion
// ============================================================================

/// What to do when a referenced variable is unset.
enum Unset<'a> {
    /// `${VAR}`: empty string plus a warning
    Warn,
    /// `${VAR:-text}`
    Default(&'a str),
    /// `${VAR:?message}`
    Fail(&'a str),
}

/// Splits the inside of `${...}` into the variable name and its fallback.
fn parse_reference(body: &str) -> (&str, Unset<'_>) {
    if let Some((name, rest)) = body.split_once(':') {
        if let Some(default) = rest.strip_prefix('-') {
            return (name, Unset::Default(default));
        }
        if let Some(message) = rest.strip_prefix('?') {
            return (name, Unset::Fail(message));
        }
    }
    (body, Unset::Warn)
}

/// Expands `${VAR}`, `${VAR:-default}` and `${VAR:?message}` in `text`;
/// `$$` is a literal `$`.
fn expand_env(text: &str, source: &Path) -> Result<(String, Vec<LoadWarning>), ConfigError> {
    let mut out = String::with_capacity(text.len());
    let mut warnings = Vec::new();
    let mut rest = text;

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(tail) = after.strip_prefix('{') {
            let Some(close) = tail.find('}') else {
                return Err(ConfigError::ParseError {
                    path: PathBuf::from(source),
                    line: None,
                    message: format!("unclosed environment variable reference: ${{{tail}"),
                });
            };
            let (name, unset) = parse_reference(&tail[..close]);
            match (std::env::var(name), unset) {
                (Ok(value), _) => out.push_str(&value),
                (Err(_), Unset::Default(default)) => out.push_str(default),
                (Err(_), Unset::Fail(message)) => {
                    return Err(ConfigError::EnvVarNotSet {
                        var: name.to_string(),
                        location: message.to_string(),
                    });
                }
                (Err(_), Unset::Warn) => warnings.push(LoadWarning {
                    message: format!("environment variable '{name}' is not set, using empty string"),
                    location: Some(source.display().to_string()),
                }),
            }
            rest = &tail[close + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);

    Ok((out, warnings))
}
