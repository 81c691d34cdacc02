//! Presence store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tandem_core::result::AppResult;
use tandem_core::types::UserId;
use tandem_entity::presence::PresenceRecord;

/// Durable map from user to last heartbeat time.
#[async_trait]
pub trait PresenceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Record a heartbeat. Creates the record on first call.
    ///
    /// `last_seen_at` never moves backwards: an older `seen_at` than the
    /// stored one leaves the record unchanged.
    async fn touch(&self, user_id: UserId, seen_at: DateTime<Utc>) -> AppResult<PresenceRecord>;

    /// Fetch one record.
    async fn find(&self, user_id: UserId) -> AppResult<Option<PresenceRecord>>;

    /// Fetch the records that exist for `user_ids`, in no particular order.
    async fn find_many(&self, user_ids: &[UserId]) -> AppResult<Vec<PresenceRecord>>;

    /// Whether the store answers.
    async fn health_check(&self) -> AppResult<bool>;
}
