//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tandem_realtime::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: i64,
}

/// Readiness response with store and feed details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Configured store provider.
    pub store_provider: String,
    /// Presence store reachability.
    pub presence_store: String,
    /// Session store reachability.
    pub session_store: String,
    /// Open feeds.
    pub feeds_open: usize,
    /// Users with at least one open feed.
    pub feed_users: usize,
    /// Feed counters.
    pub feed_metrics: MetricsSnapshot,
    /// Snapshot time.
    pub checked_at: DateTime<Utc>,
}
