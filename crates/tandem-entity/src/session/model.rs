//! Focus session entity model.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use tandem_core::types::{SessionId, UserId};

use super::status::{SessionOrigin, SessionStatus};

/// Canonical form of a session's participant set.
///
/// The sorted, de-duplicated user IDs joined with `,`. Two sessions have
/// the same participant set exactly when their keys are equal, which is
/// what the storage-level uniqueness fence on active sessions relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ParticipantKey(String);

impl ParticipantKey {
    /// Build the key for a set of users. Order and duplicates are ignored.
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a UserId>) -> Self {
        let sorted: BTreeSet<&UserId> = users.into_iter().collect();
        let joined = sorted
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self(joined)
    }

    /// The key as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shared focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FocusSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Manual or auto-join.
    pub origin: SessionOrigin,
    /// Canonical participant set.
    pub participant_key: ParticipantKey,
    /// When the session started.
    pub start_time: DateTime<Utc>,
    /// When the session was planned to end.
    pub planned_end_time: DateTime<Utc>,
    /// When the session actually ended; set on termination.
    pub end_time: Option<DateTime<Utc>>,
    /// Focused minutes; set once on termination.
    pub minutes: Option<i64>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl FocusSession {
    /// Whether the session is still running.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whole minutes elapsed between `start_time` and `until`, never negative.
    pub fn elapsed_minutes(&self, until: DateTime<Utc>) -> i64 {
        (until - self.start_time).num_minutes().max(0)
    }

    /// Whether the session terminated at or after `since`.
    pub fn ended_since(&self, since: DateTime<Utc>) -> bool {
        self.status.is_terminal() && self.end_time.is_some_and(|t| t >= since)
    }
}

/// Data required to create a session together with its participant rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFocusSession {
    /// Pre-generated session ID.
    pub id: SessionId,
    /// Participants, sorted and de-duplicated.
    pub participants: Vec<UserId>,
    /// Canonical participant set.
    pub participant_key: ParticipantKey,
    /// Start time.
    pub start_time: DateTime<Utc>,
    /// Planned end time.
    pub planned_end_time: DateTime<Utc>,
    /// Manual or auto-join.
    pub origin: SessionOrigin,
    /// Creation time, used for participant `updated_at` as well.
    pub created_at: DateTime<Utc>,
}

impl NewFocusSession {
    /// Builds a creation request, normalizing the participant set.
    pub fn new(
        participants: impl IntoIterator<Item = UserId>,
        start_time: DateTime<Utc>,
        planned_end_time: DateTime<Utc>,
        origin: SessionOrigin,
        created_at: DateTime<Utc>,
    ) -> Self {
        let set: BTreeSet<UserId> = participants.into_iter().collect();
        let participants: Vec<UserId> = set.into_iter().collect();
        let participant_key = ParticipantKey::from_users(&participants);
        Self {
            id: SessionId::new(),
            participants,
            participant_key,
            start_time,
            planned_end_time,
            origin,
            created_at,
        }
    }
}

/// A terminal transition to apply with compare-and-set semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTermination {
    /// Target status; must be terminal.
    pub status: SessionStatus,
    /// End time to record.
    pub end_time: DateTime<Utc>,
    /// Minutes to record.
    pub minutes: i64,
}
