//! Projections returned by the session coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tandem_core::types::{SessionId, UserId};

use super::model::FocusSession;
use super::participant::{SessionParticipant, aggregate_paused};
use super::status::SessionStatus;

/// Authoritative view of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusView {
    /// The session row.
    pub session: FocusSession,
    /// Copy of `session.status` for clients that only read the top level.
    pub status: SessionStatus,
    /// OR of all participants' pause flags.
    pub aggregate_paused: bool,
    /// Participant rows.
    pub participants: Vec<SessionParticipant>,
}

impl SessionStatusView {
    /// Assemble a view, computing the aggregate.
    pub fn new(session: FocusSession, participants: Vec<SessionParticipant>) -> Self {
        Self {
            status: session.status,
            aggregate_paused: aggregate_paused(&participants),
            session,
            participants,
        }
    }

    /// Whether `user_id` participates in the session.
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// OR of the pause flags of everyone except `user_id`.
    pub fn others_paused(&self, user_id: UserId) -> bool {
        self.participants
            .iter()
            .any(|p| p.user_id != user_id && p.is_paused)
    }
}

/// Result of a pause write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseResult {
    /// Session ID.
    pub session_id: SessionId,
    /// OR of all participants' pause flags after the write.
    pub aggregate_paused: bool,
    /// Participant rows after the write.
    pub participants: Vec<SessionParticipant>,
}

/// Result of an end or cancel call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOutcome {
    /// Final session state.
    pub session: FocusSession,
    /// `true` when the session was already terminal and nothing changed.
    pub already_ended: bool,
}

/// Everything a user's session feed shows at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsSnapshot {
    /// Snapshot time.
    pub as_of: DateTime<Utc>,
    /// Sessions currently active.
    pub active: Vec<SessionStatusView>,
    /// Sessions terminated within the retention window.
    pub recently_ended: Vec<SessionStatusView>,
}

impl SessionsSnapshot {
    /// Find a session in either list.
    pub fn find(&self, id: SessionId) -> Option<&SessionStatusView> {
        self.active
            .iter()
            .chain(self.recently_ended.iter())
            .find(|v| v.session.id == id)
    }
}
