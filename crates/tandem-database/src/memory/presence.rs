//! In-memory presence store backed by `DashMap`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use tandem_core::result::AppResult;
use tandem_core::types::UserId;
use tandem_entity::presence::PresenceRecord;

use crate::traits::PresenceStore;

/// In-memory presence store.
#[derive(Debug, Clone, Default)]
pub struct MemoryPresenceStore {
    last_seen: Arc<DashMap<UserId, DateTime<Utc>>>,
}

impl MemoryPresenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn touch(&self, user_id: UserId, seen_at: DateTime<Utc>) -> AppResult<PresenceRecord> {
        let mut entry = self.last_seen.entry(user_id).or_insert(seen_at);
        if *entry < seen_at {
            *entry = seen_at;
        }
        Ok(PresenceRecord {
            user_id,
            last_seen_at: *entry,
        })
    }

    async fn find(&self, user_id: UserId) -> AppResult<Option<PresenceRecord>> {
        Ok(self.last_seen.get(&user_id).map(|at| PresenceRecord {
            user_id,
            last_seen_at: *at,
        }))
    }

    async fn find_many(&self, user_ids: &[UserId]) -> AppResult<Vec<PresenceRecord>> {
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                self.last_seen.get(id).map(|at| PresenceRecord {
                    user_id: *id,
                    last_seen_at: *at,
                })
            })
            .collect())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_touch_never_moves_backwards() {
        let store = MemoryPresenceStore::new();
        let user = UserId::new();
        let now = Utc::now();

        store.touch(user, now).await.unwrap();
        let record = store.touch(user, now - Duration::seconds(30)).await.unwrap();
        assert_eq!(record.last_seen_at, now);

        let record = store.touch(user, now + Duration::seconds(5)).await.unwrap();
        assert_eq!(record.last_seen_at, now + Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_find_many_skips_unknown_users() {
        let store = MemoryPresenceStore::new();
        let known = UserId::new();
        store.touch(known, Utc::now()).await.unwrap();

        let records = store.find_many(&[known, UserId::new()]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, known);
    }
}
