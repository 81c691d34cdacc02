//! Top-level feed engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tandem_core::config::RealtimeConfig;
use tandem_core::error::AppError;
use tandem_core::result::AppResult;
use tandem_core::types::{ConnectionId, UserId};

use crate::connection::registry::ConnectionRegistry;
use crate::feed::runner::{FeedSettings, run_feed};
use crate::feed::source::SnapshotSource;
use crate::message::{FeedKind, OutboundFrame};
use crate::metrics::FeedMetrics;

/// Opens feeds and owns their lifecycle.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Live feeds.
    pub registry: Arc<ConnectionRegistry>,
    /// Shared counters.
    pub metrics: Arc<FeedMetrics>,
    sessions: Arc<dyn SnapshotSource>,
    presence: Arc<dyn SnapshotSource>,
    config: RealtimeConfig,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("feeds", &self.registry.total_feeds())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new engine over the two snapshot sources.
    pub fn new(
        config: RealtimeConfig,
        sessions: Arc<dyn SnapshotSource>,
        presence: Arc<dyn SnapshotSource>,
    ) -> Self {
        let metrics = Arc::new(FeedMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(
            config.max_feeds_per_user,
            metrics.clone(),
        ));
        info!("Realtime engine initialized");
        Self {
            registry,
            metrics,
            sessions,
            presence,
            config,
        }
    }

    /// Start a feed of `kind` for `user_id`.
    ///
    /// The feed runs until the returned subscription is dropped or closed,
    /// the first query error, or [`shutdown`](Self::shutdown).
    pub fn open_feed(&self, user_id: UserId, kind: FeedKind) -> AppResult<FeedSubscription> {
        if self.registry.is_closed() {
            return Err(AppError::transient("Realtime engine is shutting down"));
        }

        let (source, interval) = match kind {
            FeedKind::Sessions => (
                self.sessions.clone(),
                self.config.session_frame_interval(),
            ),
            FeedKind::Presence => (
                self.presence.clone(),
                self.config.presence_frame_interval(),
            ),
        };
        let settings = FeedSettings {
            interval,
            query_timeout: self.config.frame_query_timeout(),
        };

        let handle = self.registry.register(user_id, kind);
        let (tx, rx) = mpsc::channel(self.config.outbound_buffer.max(1));
        let token = handle.token();

        let registry = self.registry.clone();
        let metrics = self.metrics.clone();
        let conn_id = handle.id;
        let task_token = token.clone();
        tokio::spawn(async move {
            let exit = run_feed(conn_id, user_id, source, settings, tx, task_token, metrics).await;
            debug!(conn_id = %conn_id, ?exit, "Feed task finished");
            registry.unregister(conn_id);
        });

        Ok(FeedSubscription {
            id: conn_id,
            kind,
            rx,
            token,
        })
    }

    /// Cancel every feed and refuse new ones.
    pub fn shutdown(&self) {
        info!("Shutting down realtime engine");
        self.registry.close_all();
    }
}

/// Receiving end of a feed.
///
/// Dropping the subscription cancels the feed.
#[derive(Debug)]
pub struct FeedSubscription {
    /// Connection ID.
    pub id: ConnectionId,
    /// Feed kind.
    pub kind: FeedKind,
    rx: mpsc::Receiver<OutboundFrame>,
    token: CancellationToken,
}

impl FeedSubscription {
    /// Next frame, or `None` once the feed has stopped.
    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.rx.recv().await
    }

    /// Token that fires when the feed is stopped from the server side.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the feed.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use tandem_core::clock::{Clock, ManualClock};
    use tandem_core::config::{PresenceConfig, SessionConfig};
    use tandem_database::memory::{MemoryFriendGraph, MemoryPresenceStore, MemorySessionStore};
    use tandem_entity::session::SessionOrigin;
    use tandem_service::{PresenceHeartbeatService, SessionCoordinator};

    use crate::feed::source::{PresenceSnapshotSource, SessionSnapshotSource};

    struct Fixture {
        clock: Arc<ManualClock>,
        coordinator: Arc<SessionCoordinator>,
        graph: MemoryFriendGraph,
        presence: Arc<PresenceHeartbeatService>,
        engine: RealtimeEngine,
    }

    fn fixture(config: RealtimeConfig) -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::new(MemorySessionStore::new()),
            clock.clone(),
            SessionConfig::default(),
        ));
        let graph = MemoryFriendGraph::new();
        let presence = Arc::new(PresenceHeartbeatService::new(
            Arc::new(MemoryPresenceStore::new()),
            Arc::new(graph.clone()),
            clock.clone(),
            PresenceConfig::default(),
        ));
        let engine = RealtimeEngine::new(
            config,
            Arc::new(SessionSnapshotSource::new(coordinator.clone())),
            Arc::new(PresenceSnapshotSource::new(presence.clone(), clock.clone())),
        );
        Fixture {
            clock,
            coordinator,
            graph,
            presence,
            engine,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_feed_reflects_new_sessions() {
        let f = fixture(RealtimeConfig::default());
        let (a, b) = (UserId::new(), UserId::new());
        let mut feed = f.engine.open_feed(a, FeedKind::Sessions).unwrap();

        match feed.recv().await {
            Some(OutboundFrame::Sessions { snapshot }) => assert!(snapshot.active.is_empty()),
            other => panic!("unexpected frame {other:?}"),
        }

        let now = f.clock.now();
        let view = f
            .coordinator
            .create([a, b], now, now + chrono::Duration::minutes(30), SessionOrigin::Manual)
            .await
            .unwrap();

        match feed.recv().await {
            Some(OutboundFrame::Sessions { snapshot }) => {
                assert!(snapshot.find(view.session.id).is_some());
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_feed_lists_friends() {
        let f = fixture(RealtimeConfig::default());
        let (me, friend) = (UserId::new(), UserId::new());
        f.graph.befriend(me, friend);
        f.presence.heartbeat(friend).await.unwrap();

        let mut feed = f.engine.open_feed(me, FeedKind::Presence).unwrap();
        match feed.recv().await {
            Some(OutboundFrame::Presence { friends, .. }) => {
                assert_eq!(friends.len(), 1);
                assert!(friends[0].is_online);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_subscription_unregisters_feed() {
        let f = fixture(RealtimeConfig::default());
        let user = UserId::new();
        let mut feed = f.engine.open_feed(user, FeedKind::Sessions).unwrap();
        feed.recv().await.unwrap();
        assert_eq!(f.engine.registry.user_feeds(user), 1);

        drop(feed);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(f.engine.registry.user_feeds(user), 0);
        assert_eq!(f.engine.metrics.snapshot().feeds_active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_feeds_and_refuses_new_ones() {
        let f = fixture(RealtimeConfig::default());
        let user = UserId::new();
        let mut feed = f.engine.open_feed(user, FeedKind::Sessions).unwrap();
        feed.recv().await.unwrap();

        f.engine.shutdown();
        assert!(feed.recv().await.is_none());
        assert!(f.engine.open_feed(user, FeedKind::Presence).is_err());
    }
}
