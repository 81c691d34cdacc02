//! Friendship repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use tandem_core::result::AppResult;
use tandem_core::types::UserId;

use super::db_error;
use crate::traits::FriendGraph;

/// Reads the `friendships` table. Rows are stored once per pair, in
/// either direction.
#[derive(Debug, Clone)]
pub struct FriendRepository {
    pool: PgPool,
}

impl FriendRepository {
    /// Create a new friend repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a friendship. Existing pairs are left alone.
    pub async fn befriend(&self, a: UserId, b: UserId) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO friendships (user_a, user_b) VALUES (LEAST($1, $2), GREATEST($1, $2)) \
             ON CONFLICT DO NOTHING",
        )
        .bind(a)
        .bind(b)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert friendship", e))?;
        Ok(())
    }
}

#[async_trait]
impl FriendGraph for FriendRepository {
    async fn friends_of(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT user_b FROM friendships WHERE user_a = $1 \
             UNION \
             SELECT user_a FROM friendships WHERE user_b = $1 \
             ORDER BY 1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load friends", e))
    }
}
