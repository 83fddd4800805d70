//! Configuration validation.
//!
//! Runs on the deserialized [`ClientConfig`] and collects every issue
//! instead of stopping at the first.

use url::Url;

use crate::config::schema::ClientConfig;
use crate::error::{Severity, ValidationIssue};

/// Reconnect intervals above this draw a warning.
const LONG_RECONNECT_INTERVAL_MS: u64 = 60_000;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &ClientConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_url(&config.url);
        self.validate_reconnect_interval(config.reconnect_interval_ms);
        self.validate_voting_duration(config.initial_voting_duration_seconds);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Field checks
    // ========================================================================

    fn validate_url(&mut self, raw: &str) {
        if raw.trim().is_empty() {
            self.add_error("url", "URL is required and cannot be empty");
            return;
        }
        match Url::parse(raw) {
            Ok(url) => {
                if !matches!(url.scheme(), "ws" | "wss") {
                    self.add_error(
                        "url",
                        &format!("scheme must be ws or wss, got '{}'", url.scheme()),
                    );
                }
                if url.host_str().is_none() {
                    self.add_error("url", "URL has no host");
                }
            }
            Err(e) => self.add_error("url", &format!("invalid URL: {e}")),
        }
    }

    fn validate_reconnect_interval(&mut self, interval_ms: u64) {
        if interval_ms == 0 {
            self.add_error("reconnect_interval_ms", "reconnect interval must be positive");
        } else if interval_ms > LONG_RECONNECT_INTERVAL_MS {
            self.add_warning(
                "reconnect_interval_ms",
                &format!(
                    "reconnect interval of {interval_ms} ms is unusually long (> {LONG_RECONNECT_INTERVAL_MS} ms)"
                ),
            );
        }
    }

    fn validate_voting_duration(&mut self, seconds: u32) {
        if seconds == 0 {
            self.add_error(
                "initial_voting_duration_seconds",
                "voting duration must be positive",
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
