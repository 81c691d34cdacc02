//! Update feed configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Push-feed cadence and resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Session snapshot cadence. Tight, since pause transitions are
    /// latency-sensitive.
    #[serde(default = "default_session_interval")]
    pub session_frame_interval_ms: u64,
    /// Friend presence snapshot cadence.
    #[serde(default = "default_presence_interval")]
    pub presence_frame_interval_ms: u64,
    /// Upper bound on a single snapshot query; slower frames are skipped.
    #[serde(default = "default_frame_timeout")]
    pub frame_query_timeout_ms: u64,
    /// Maximum concurrent feeds per user; the oldest is closed on overflow.
    #[serde(default = "default_max_feeds_per_user")]
    pub max_feeds_per_user: usize,
    /// Outbound frame buffer per connection.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl RealtimeConfig {
    /// Session frame cadence.
    pub fn session_frame_interval(&self) -> Duration {
        Duration::from_millis(self.session_frame_interval_ms)
    }

    /// Presence frame cadence.
    pub fn presence_frame_interval(&self) -> Duration {
        Duration::from_millis(self.presence_frame_interval_ms)
    }

    /// Per-frame query timeout.
    pub fn frame_query_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_query_timeout_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            session_frame_interval_ms: default_session_interval(),
            presence_frame_interval_ms: default_presence_interval(),
            frame_query_timeout_ms: default_frame_timeout(),
            max_feeds_per_user: default_max_feeds_per_user(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_session_interval() -> u64 {
    2000
}

fn default_presence_interval() -> u64 {
    10_000
}

fn default_frame_timeout() -> u64 {
    1500
}

fn default_max_feeds_per_user() -> usize {
    5
}

fn default_outbound_buffer() -> usize {
    32
}
