//! Session store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tandem_core::result::AppResult;
use tandem_core::types::{SessionId, UserId};
use tandem_entity::session::{
    FocusSession, NewFocusSession, ParticipantKey, SessionParticipant, SessionStatusView,
    SessionTermination,
};

/// Durable storage for focus sessions and their participant rows.
///
/// Implementations guarantee that at most one `active` session exists per
/// [`ParticipantKey`]; a second `create` for the same key fails with
/// `ErrorKind::Conflict` no matter how many processes race.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Atomically insert a session and one participant row per user, all
    /// unpaused.
    async fn create(&self, new: &NewFocusSession) -> AppResult<SessionStatusView>;

    /// Fetch a session row.
    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<FocusSession>>;

    /// Participant rows for one session, ordered by user ID.
    async fn participants(&self, id: SessionId) -> AppResult<Vec<SessionParticipant>>;

    /// Participant rows for several sessions.
    async fn participants_for(&self, ids: &[SessionId]) -> AppResult<Vec<SessionParticipant>>;

    /// Set one participant's pause flag.
    ///
    /// Applies only while the session is active, the user participates, and
    /// no newer write has landed (`updated_at <= at`). Returns whether the
    /// write was applied.
    async fn write_pause(
        &self,
        session_id: SessionId,
        user_id: UserId,
        is_paused: bool,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Move an active session to a terminal status.
    ///
    /// Compare-and-set on `status = active`: returns the updated row, or
    /// `None` if the session was missing or already terminal.
    async fn terminate(
        &self,
        id: SessionId,
        termination: &SessionTermination,
    ) -> AppResult<Option<FocusSession>>;

    /// The active session for a participant set, if any.
    async fn find_active_by_key(&self, key: &ParticipantKey) -> AppResult<Option<FocusSession>>;

    /// The most recently started session for a participant set, any status.
    async fn find_latest_by_key(&self, key: &ParticipantKey) -> AppResult<Option<FocusSession>>;

    /// Sessions involving `user_id` that are active or ended at or after
    /// `ended_since`, newest first.
    async fn find_for_user(
        &self,
        user_id: UserId,
        ended_since: DateTime<Utc>,
    ) -> AppResult<Vec<FocusSession>>;

    /// Terminal sessions involving `user_id`, most recently ended first.
    async fn history_for_user(&self, user_id: UserId, limit: i64) -> AppResult<Vec<FocusSession>>;

    /// Whether the store answers.
    async fn health_check(&self) -> AppResult<bool>;
}
