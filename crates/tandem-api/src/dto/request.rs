//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use tandem_core::error::AppError;
use tandem_core::types::UserId;

/// Bulk presence lookup.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PresenceQueryRequest {
    /// Users to look up; the response keeps this order.
    #[validate(length(min = 1, max = 500, message = "user_ids must hold 1 to 500 entries"))]
    pub user_ids: Vec<UserId>,
}

/// Manual session creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSessionRequest {
    /// Participants, including the caller.
    #[validate(length(max = 32, message = "At most 32 participants"))]
    pub participant_ids: Vec<UserId>,
    /// Defaults to now.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Defaults to start plus the configured duration.
    #[serde(default)]
    pub planned_end_time: Option<DateTime<Utc>>,
}

/// Pause signal from one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseRequest {
    /// Whether the caller's device reports paused.
    pub is_paused: bool,
}

/// Optional overrides when ending a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EndSessionRequest {
    /// Defaults to now.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Focused minutes as tracked by the client.
    #[serde(default)]
    #[validate(range(min = 0, message = "minutes must not be negative"))]
    pub minutes: Option<i64>,
}

/// `?limit=` for history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Maximum entries to return.
    pub limit: Option<u32>,
}

/// `?token=` for WebSocket upgrades.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    /// Bearer token.
    pub token: String,
}

/// Run `validator` checks, mapping failures to a validation error.
pub fn validate<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}
