//! Heartbeat ingestion and online-status queries.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tandem_core::clock::Clock;
use tandem_core::config::PresenceConfig;
use tandem_core::result::AppResult;
use tandem_core::types::UserId;
use tandem_database::traits::{FriendGraph, PresenceStore};
use tandem_entity::presence::{PresenceRecord, PresenceView};

use crate::session::AutoJoinDetector;

/// Acknowledgement returned to a heartbeating client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatAck {
    /// The user who heartbeated.
    pub user_id: UserId,
    /// Stored last-seen time after the write.
    pub last_seen_at: DateTime<Utc>,
}

/// Records heartbeats and answers online-status queries.
#[derive(Debug, Clone)]
pub struct PresenceHeartbeatService {
    presence: Arc<dyn PresenceStore>,
    friends: Arc<dyn FriendGraph>,
    clock: Arc<dyn Clock>,
    config: PresenceConfig,
    detector: Option<Arc<AutoJoinDetector>>,
}

impl PresenceHeartbeatService {
    /// Creates a new heartbeat service without auto-join.
    pub fn new(
        presence: Arc<dyn PresenceStore>,
        friends: Arc<dyn FriendGraph>,
        clock: Arc<dyn Clock>,
        config: PresenceConfig,
    ) -> Self {
        Self {
            presence,
            friends,
            clock,
            config,
            detector: None,
        }
    }

    /// Run `detector` after every heartbeat write.
    pub fn with_detector(mut self, detector: Arc<AutoJoinDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Presence settings in effect.
    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Record that `user_id` is alive now.
    ///
    /// Store failures propagate. Auto-join failures are logged and never
    /// fail the heartbeat.
    pub async fn heartbeat(&self, user_id: UserId) -> AppResult<HeartbeatAck> {
        let record = self.presence.touch(user_id, self.clock.now()).await?;
        debug!(user_id = %user_id, "Heartbeat recorded");

        if let Some(detector) = self.detector.as_ref().filter(|d| d.is_enabled()) {
            match detector.on_heartbeat(user_id).await {
                Ok(report) if !report.created.is_empty() => {
                    debug!(user_id = %user_id, created = report.created.len(), "Auto-join pass");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Auto-join detection failed");
                }
            }
        }

        Ok(HeartbeatAck {
            user_id,
            last_seen_at: record.last_seen_at,
        })
    }

    /// Online status of one user.
    pub async fn is_online(&self, user_id: UserId) -> AppResult<PresenceView> {
        let record = self.presence.find(user_id).await?;
        Ok(PresenceView::derive(
            user_id,
            record.as_ref(),
            self.clock.now(),
            self.config.online_window(),
        ))
    }

    /// Online status of many users, in the order given.
    pub async fn is_online_many(&self, user_ids: &[UserId]) -> AppResult<Vec<PresenceView>> {
        let records: HashMap<UserId, PresenceRecord> = self
            .presence
            .find_many(user_ids)
            .await?
            .into_iter()
            .map(|r| (r.user_id, r))
            .collect();
        let now = self.clock.now();
        let window = self.config.online_window();
        Ok(user_ids
            .iter()
            .map(|id| PresenceView::derive(*id, records.get(id), now, window))
            .collect())
    }

    /// Online status of every friend of `user_id`.
    pub async fn friends_presence(&self, user_id: UserId) -> AppResult<Vec<PresenceView>> {
        let friends = self.friends.friends_of(user_id).await?;
        self.is_online_many(&friends).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use tandem_core::clock::ManualClock;
    use tandem_core::config::{AutoJoinConfig, SessionConfig};
    use tandem_core::error::{AppError, ErrorKind};
    use tandem_database::memory::{MemoryFriendGraph, MemoryPresenceStore, MemorySessionStore};

    use crate::session::SessionCoordinator;

    fn service(clock: Arc<ManualClock>, graph: MemoryFriendGraph) -> PresenceHeartbeatService {
        PresenceHeartbeatService::new(
            Arc::new(MemoryPresenceStore::new()),
            Arc::new(graph),
            clock,
            PresenceConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_heartbeat_is_idempotent_and_sets_online() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let svc = service(clock.clone(), MemoryFriendGraph::new());
        let user = UserId::new();

        let first = svc.heartbeat(user).await.unwrap();
        let second = svc.heartbeat(user).await.unwrap();
        assert_eq!(first, second);
        assert!(svc.is_online(user).await.unwrap().is_online);
    }

    #[tokio::test]
    async fn test_online_window_expires() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let svc = service(clock.clone(), MemoryFriendGraph::new());
        let user = UserId::new();
        svc.heartbeat(user).await.unwrap();

        clock.advance(Duration::seconds(60));
        assert!(svc.is_online(user).await.unwrap().is_online);
        clock.advance(Duration::seconds(1));
        let view = svc.is_online(user).await.unwrap();
        assert!(!view.is_online);
        assert!(view.last_seen_at.is_some());
    }

    #[tokio::test]
    async fn test_is_online_many_preserves_order() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let svc = service(clock, MemoryFriendGraph::new());
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        svc.heartbeat(b).await.unwrap();

        let views = svc.is_online_many(&[c, b, a]).await.unwrap();
        let ids: Vec<UserId> = views.iter().map(|v| v.user_id).collect();
        assert_eq!(ids, vec![c, b, a]);
        assert_eq!(
            views.iter().map(|v| v.is_online).collect::<Vec<_>>(),
            vec![false, true, false]
        );
    }

    #[tokio::test]
    async fn test_friends_presence_lists_friends_only() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let graph = MemoryFriendGraph::new();
        let (me, friend, stranger) = (UserId::new(), UserId::new(), UserId::new());
        graph.befriend(me, friend);
        let svc = service(clock, graph);
        svc.heartbeat(friend).await.unwrap();
        svc.heartbeat(stranger).await.unwrap();

        let views = svc.friends_presence(me).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].user_id, friend);
        assert!(views[0].is_online);
    }

    #[derive(Debug)]
    struct BrokenFriends;

    #[async_trait]
    impl FriendGraph for BrokenFriends {
        async fn friends_of(&self, _user_id: UserId) -> AppResult<Vec<UserId>> {
            Err(AppError::transient("friend service down"))
        }
    }

    #[tokio::test]
    async fn test_detector_failure_does_not_fail_heartbeat() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let presence = Arc::new(MemoryPresenceStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            sessions.clone(),
            clock.clone(),
            SessionConfig::default(),
        ));
        let detector = Arc::new(AutoJoinDetector::new(
            coordinator,
            sessions,
            presence.clone(),
            Arc::new(BrokenFriends),
            clock.clone(),
            PresenceConfig::default(),
            AutoJoinConfig::default(),
        ));
        let svc = PresenceHeartbeatService::new(
            presence,
            Arc::new(MemoryFriendGraph::new()),
            clock,
            PresenceConfig::default(),
        )
        .with_detector(detector);

        let ack = svc.heartbeat(UserId::new()).await;
        assert!(ack.is_ok());
    }

    #[derive(Debug)]
    struct DownPresence;

    #[async_trait]
    impl PresenceStore for DownPresence {
        async fn touch(&self, _: UserId, _: DateTime<Utc>) -> AppResult<PresenceRecord> {
            Err(AppError::transient("store unavailable"))
        }
        async fn find(&self, _: UserId) -> AppResult<Option<PresenceRecord>> {
            Err(AppError::transient("store unavailable"))
        }
        async fn find_many(&self, _: &[UserId]) -> AppResult<Vec<PresenceRecord>> {
            Err(AppError::transient("store unavailable"))
        }
        async fn health_check(&self) -> AppResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_transient() {
        let svc = PresenceHeartbeatService::new(
            Arc::new(DownPresence),
            Arc::new(MemoryFriendGraph::new()),
            Arc::new(ManualClock::new(Utc::now())),
            PresenceConfig::default(),
        );
        let err = svc.heartbeat(UserId::new()).await.unwrap_err();
        assert!(err.is(ErrorKind::Transient));
        assert!(err.kind.is_retryable());
    }
}
