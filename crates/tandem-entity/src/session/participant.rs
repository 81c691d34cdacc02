//! Per-participant pause state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use tandem_core::types::{SessionId, UserId};

/// One participant's locally sensed pause signal within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SessionParticipant {
    /// Session ID.
    pub session_id: SessionId,
    /// Participant user ID.
    pub user_id: UserId,
    /// Whether this participant reports paused.
    pub is_paused: bool,
    /// When `is_paused` was last written.
    pub updated_at: DateTime<Utc>,
}

/// The session-wide pause state: paused if any participant is paused.
pub fn aggregate_paused(participants: &[SessionParticipant]) -> bool {
    participants.iter().any(|p| p.is_paused)
}
