//! Presence repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tandem_core::result::AppResult;
use tandem_core::types::UserId;
use tandem_entity::presence::PresenceRecord;

use super::db_error;
use crate::traits::PresenceStore;

/// PostgreSQL-backed presence store.
#[derive(Debug, Clone)]
pub struct PresenceRepository {
    pool: PgPool,
}

impl PresenceRepository {
    /// Create a new presence repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceStore for PresenceRepository {
    async fn touch(&self, user_id: UserId, seen_at: DateTime<Utc>) -> AppResult<PresenceRecord> {
        sqlx::query_as::<_, PresenceRecord>(
            "INSERT INTO presence (user_id, last_seen_at) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE \
             SET last_seen_at = GREATEST(presence.last_seen_at, EXCLUDED.last_seen_at) \
             RETURNING user_id, last_seen_at",
        )
        .bind(user_id)
        .bind(seen_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record heartbeat", e))
    }

    async fn find(&self, user_id: UserId) -> AppResult<Option<PresenceRecord>> {
        sqlx::query_as::<_, PresenceRecord>(
            "SELECT user_id, last_seen_at FROM presence WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find presence", e))
    }

    async fn find_many(&self, user_ids: &[UserId]) -> AppResult<Vec<PresenceRecord>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = user_ids.iter().map(|u| u.into_uuid()).collect();
        sqlx::query_as::<_, PresenceRecord>(
            "SELECT user_id, last_seen_at FROM presence WHERE user_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to query presence", e))
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| db_error("Presence health check failed", e))
    }
}
