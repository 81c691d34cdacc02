//! Focus session coordination configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Focus session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long terminated sessions keep appearing in "my sessions"
    /// snapshots, so a client mid-poll still observes the termination.
    #[serde(default = "default_recently_ended_retention")]
    pub recently_ended_retention_seconds: u64,
    /// Maximum number of entries returned by the history endpoint.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Automatic pairing of online friends.
    #[serde(default)]
    pub auto_join: AutoJoinConfig,
}

impl SessionConfig {
    /// The recently-ended retention window as a chrono duration.
    pub fn recently_ended_retention(&self) -> Duration {
        Duration::seconds(self.recently_ended_retention_seconds as i64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recently_ended_retention_seconds: default_recently_ended_retention(),
            history_limit: default_history_limit(),
            auto_join: AutoJoinConfig::default(),
        }
    }
}

/// Auto-join detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoJoinConfig {
    /// Whether heartbeats trigger friend-pair detection.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Planned length of auto-created sessions.
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
    /// A pair whose last session ended less than this long ago is not
    /// paired again.
    #[serde(default = "default_rejoin_cooldown")]
    pub rejoin_cooldown_seconds: u64,
}

impl AutoJoinConfig {
    /// Planned duration of auto-created sessions.
    pub fn default_duration(&self) -> Duration {
        Duration::minutes(self.default_duration_minutes as i64)
    }

    /// Rejoin cooldown as a chrono duration.
    pub fn rejoin_cooldown(&self) -> Duration {
        Duration::seconds(self.rejoin_cooldown_seconds as i64)
    }
}

impl Default for AutoJoinConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_duration_minutes: default_duration_minutes(),
            rejoin_cooldown_seconds: default_rejoin_cooldown(),
        }
    }
}

fn default_recently_ended_retention() -> u64 {
    60
}

fn default_history_limit() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

fn default_duration_minutes() -> u32 {
    60
}

fn default_rejoin_cooldown() -> u64 {
    300
}
