//! Presence record and its derived online view.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use tandem_core::types::UserId;

/// Last observed activity for a user.
///
/// Only heartbeat writes touch this row; it is overwritten, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PresenceRecord {
    /// The user this record belongs to.
    pub user_id: UserId,
    /// Time of the most recent heartbeat.
    pub last_seen_at: DateTime<Utc>,
}

impl PresenceRecord {
    /// Whether the user counts as online at `now`.
    ///
    /// A heartbeat exactly `window` old is still online.
    pub fn is_online_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.last_seen_at <= window
    }
}

/// Online status as seen by other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceView {
    /// User ID.
    pub user_id: UserId,
    /// Whether the user is online at query time.
    pub is_online: bool,
    /// Most recent heartbeat, if the user ever sent one.
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl PresenceView {
    /// Derive the view for `user_id` from an optional stored record.
    pub fn derive(
        user_id: UserId,
        record: Option<&PresenceRecord>,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            user_id,
            is_online: record.is_some_and(|r| r.is_online_at(now, window)),
            last_seen_at: record.map(|r| r.last_seen_at),
        }
    }
}
