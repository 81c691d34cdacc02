//! Focus session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use tandem_core::error::{AppError, ErrorKind};
use tandem_core::result::AppResult;
use tandem_core::types::{SessionId, UserId};
use tandem_entity::session::{
    FocusSession, NewFocusSession, ParticipantKey, SessionParticipant, SessionStatus,
    SessionStatusView, SessionTermination,
};

use super::db_error;
use crate::traits::SessionStore;

/// PostgreSQL-backed session store.
///
/// The partial unique index `focus_sessions_one_active_per_key` enforces
/// one active session per participant set across all writers.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create(&self, new: &NewFocusSession) -> AppResult<SessionStatusView> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let session = sqlx::query_as::<_, FocusSession>(
            "INSERT INTO focus_sessions \
             (id, status, origin, participant_key, start_time, planned_end_time, created_at) \
             VALUES ($1, 'active', $2, $3, $4, $5, $6) \
             RETURNING *",
        )
        .bind(new.id)
        .bind(new.origin)
        .bind(&new.participant_key)
        .bind(new.start_time)
        .bind(new.planned_end_time)
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            let err = db_error("Failed to create session", e);
            if err.is(ErrorKind::Conflict) {
                AppError::conflict(format!(
                    "An active session already exists for participants {}",
                    new.participant_key
                ))
            } else {
                err
            }
        })?;

        let user_ids: Vec<Uuid> = new.participants.iter().map(|u| u.into_uuid()).collect();
        let mut participants = sqlx::query_as::<_, SessionParticipant>(
            "INSERT INTO session_participants (session_id, user_id, is_paused, updated_at) \
             SELECT $1, u, FALSE, $3 FROM UNNEST($2::uuid[]) AS u \
             RETURNING session_id, user_id, is_paused, updated_at",
        )
        .bind(new.id)
        .bind(user_ids)
        .bind(new.created_at)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to create participants", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit session", e))?;

        debug!(session_id = %new.id, participants = participants.len(), "Session stored");
        participants.sort_by_key(|p| p.user_id);
        Ok(SessionStatusView::new(session, participants))
    }

    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<FocusSession>> {
        sqlx::query_as::<_, FocusSession>("SELECT * FROM focus_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find session", e))
    }

    async fn participants(&self, id: SessionId) -> AppResult<Vec<SessionParticipant>> {
        sqlx::query_as::<_, SessionParticipant>(
            "SELECT session_id, user_id, is_paused, updated_at FROM session_participants \
             WHERE session_id = $1 ORDER BY user_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load participants", e))
    }

    async fn participants_for(&self, ids: &[SessionId]) -> AppResult<Vec<SessionParticipant>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|s| s.into_uuid()).collect();
        sqlx::query_as::<_, SessionParticipant>(
            "SELECT session_id, user_id, is_paused, updated_at FROM session_participants \
             WHERE session_id = ANY($1) ORDER BY session_id, user_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load participants", e))
    }

    async fn write_pause(
        &self,
        session_id: SessionId,
        user_id: UserId,
        is_paused: bool,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // Shared lock: a concurrent end/cancel waits for this write or wins first.
        let status = sqlx::query_scalar::<_, SessionStatus>(
            "SELECT status FROM focus_sessions WHERE id = $1 FOR SHARE",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock session", e))?;

        if status != Some(SessionStatus::Active) {
            return Ok(false);
        }

        let result = sqlx::query(
            "UPDATE session_participants SET is_paused = $3, updated_at = $4 \
             WHERE session_id = $1 AND user_id = $2 AND updated_at <= $4",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(is_paused)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to write pause state", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit pause state", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn terminate(
        &self,
        id: SessionId,
        termination: &SessionTermination,
    ) -> AppResult<Option<FocusSession>> {
        sqlx::query_as::<_, FocusSession>(
            "UPDATE focus_sessions SET status = $2, end_time = $3, minutes = $4 \
             WHERE id = $1 AND status = 'active' \
             RETURNING *",
        )
        .bind(id)
        .bind(termination.status)
        .bind(termination.end_time)
        .bind(termination.minutes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to terminate session", e))
    }

    async fn find_active_by_key(&self, key: &ParticipantKey) -> AppResult<Option<FocusSession>> {
        sqlx::query_as::<_, FocusSession>(
            "SELECT * FROM focus_sessions WHERE participant_key = $1 AND status = 'active'",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find active session", e))
    }

    async fn find_latest_by_key(&self, key: &ParticipantKey) -> AppResult<Option<FocusSession>> {
        sqlx::query_as::<_, FocusSession>(
            "SELECT * FROM focus_sessions WHERE participant_key = $1 \
             ORDER BY start_time DESC, created_at DESC LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find latest session", e))
    }

    async fn find_for_user(
        &self,
        user_id: UserId,
        ended_since: DateTime<Utc>,
    ) -> AppResult<Vec<FocusSession>> {
        sqlx::query_as::<_, FocusSession>(
            "SELECT fs.* FROM focus_sessions fs \
             JOIN session_participants sp ON sp.session_id = fs.id \
             WHERE sp.user_id = $1 AND (fs.status = 'active' OR fs.end_time >= $2) \
             ORDER BY fs.start_time DESC",
        )
        .bind(user_id)
        .bind(ended_since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find sessions for user", e))
    }

    async fn history_for_user(&self, user_id: UserId, limit: i64) -> AppResult<Vec<FocusSession>> {
        sqlx::query_as::<_, FocusSession>(
            "SELECT fs.* FROM focus_sessions fs \
             JOIN session_participants sp ON sp.session_id = fs.id \
             WHERE sp.user_id = $1 AND fs.status <> 'active' \
             ORDER BY fs.end_time DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load session history", e))
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| db_error("Session store health check failed", e))
    }
}
