//! Configuration schema.
//!
//! The YAML document is flat: every key is optional and falls back to the
//! defaults below. Unknown keys are rejected.

use serde::{Deserialize, Serialize};

/// Coordinator endpoint used when none is configured.
pub const DEFAULT_URL: &str = "ws://localhost:8080/ws";

/// Delay between a close and the reconnect it triggers.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 500;

/// Round total assumed before a round reports its own.
pub const DEFAULT_VOTING_DURATION_SECONDS: u32 = 15;

/// Client configuration.
///
/// ```yaml
/// url: ws://localhost:8080/ws
/// reconnect_interval_ms: 500
/// initial_voting_duration_seconds: 15
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// WebSocket endpoint of the coordinator
    #[serde(default = "default_url")]
    pub url: String,

    /// Fixed delay before each reconnect, in milliseconds
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Round total used when a round is first seen already expired
    #[serde(default = "default_voting_duration")]
    pub initial_voting_duration_seconds: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            initial_voting_duration_seconds: DEFAULT_VOTING_DURATION_SECONDS,
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

const fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

const fn default_voting_duration() -> u32 {
    DEFAULT_VOTING_DURATION_SECONDS
}
