//! Presence configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Heartbeat cadence and online-window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// A user is online when their last heartbeat is at most this old.
    #[serde(default = "default_online_window")]
    pub online_window_seconds: u64,
    /// Cadence clients are told to heartbeat at.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
}

impl PresenceConfig {
    /// The online window as a chrono duration.
    pub fn online_window(&self) -> Duration {
        Duration::seconds(self.online_window_seconds as i64)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_window_seconds: default_online_window(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
        }
    }
}

fn default_online_window() -> u64 {
    60
}

fn default_heartbeat_interval() -> u64 {
    30
}
