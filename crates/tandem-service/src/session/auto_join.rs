//! Automatic session creation for friends who are online together.
//!
//! Runs after every heartbeat. For each online friend the pair is put in
//! canonical order and only the lower user ID may create; the storage
//! fence settles any race that slips past the existing-session check.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tandem_core::clock::Clock;
use tandem_core::config::{AutoJoinConfig, PresenceConfig};
use tandem_core::error::ErrorKind;
use tandem_core::result::AppResult;
use tandem_core::types::{SessionId, UserId};
use tandem_database::traits::{FriendGraph, PresenceStore, SessionStore};
use tandem_entity::session::{ParticipantKey, SessionOrigin};

use super::coordinator::SessionCoordinator;

/// What one detection pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Online friends examined.
    pub checked: usize,
    /// Sessions created by this pass.
    pub created: Vec<SessionId>,
    /// Pairs that already had an active session, including fence conflicts.
    pub skipped_existing: usize,
    /// Pairs where the heartbeating user is not the lower ID.
    pub skipped_not_leader: usize,
    /// Pairs whose last session ended inside the rejoin cooldown.
    pub skipped_cooldown: usize,
    /// Pairs where creation failed for another reason.
    pub failed: usize,
}

/// Creates a shared session when two friends are online at once.
#[derive(Debug, Clone)]
pub struct AutoJoinDetector {
    coordinator: Arc<SessionCoordinator>,
    sessions: Arc<dyn SessionStore>,
    presence: Arc<dyn PresenceStore>,
    friends: Arc<dyn FriendGraph>,
    clock: Arc<dyn Clock>,
    presence_config: PresenceConfig,
    config: AutoJoinConfig,
}

impl AutoJoinDetector {
    /// Creates a new detector.
    pub fn new(
        coordinator: Arc<SessionCoordinator>,
        sessions: Arc<dyn SessionStore>,
        presence: Arc<dyn PresenceStore>,
        friends: Arc<dyn FriendGraph>,
        clock: Arc<dyn Clock>,
        presence_config: PresenceConfig,
        config: AutoJoinConfig,
    ) -> Self {
        Self {
            coordinator,
            sessions,
            presence,
            friends,
            clock,
            presence_config,
            config,
        }
    }

    /// Whether detection is switched on.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Run one detection pass for `user_id`, who has just heartbeated.
    pub async fn on_heartbeat(&self, user_id: UserId) -> AppResult<DetectionReport> {
        let mut report = DetectionReport::default();
        if !self.config.enabled {
            return Ok(report);
        }

        let friends = self.friends.friends_of(user_id).await?;
        if friends.is_empty() {
            return Ok(report);
        }

        let now = self.clock.now();
        let window = self.presence_config.online_window();
        let online: Vec<UserId> = self
            .presence
            .find_many(&friends)
            .await?
            .into_iter()
            .filter(|r| r.is_online_at(now, window))
            .map(|r| r.user_id)
            .collect();

        for friend in online {
            if friend == user_id {
                continue;
            }
            report.checked += 1;
            let (lo, hi) = if user_id < friend {
                (user_id, friend)
            } else {
                (friend, user_id)
            };
            let key = ParticipantKey::from_users([&lo, &hi]);

            if self.sessions.find_active_by_key(&key).await?.is_some() {
                report.skipped_existing += 1;
                continue;
            }
            if user_id != lo {
                report.skipped_not_leader += 1;
                continue;
            }
            if self.in_cooldown(&key, now).await? {
                report.skipped_cooldown += 1;
                continue;
            }

            let planned_end = now + self.config.default_duration();
            match self
                .coordinator
                .create([lo, hi], now, planned_end, SessionOrigin::AutoJoin)
                .await
            {
                Ok(view) => {
                    info!(
                        session_id = %view.session.id,
                        lo = %lo,
                        hi = %hi,
                        "Auto-join session created"
                    );
                    report.created.push(view.session.id);
                }
                Err(e) if e.is(ErrorKind::Conflict) => {
                    debug!(key = %key, "Auto-join lost the creation race");
                    report.skipped_existing += 1;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Auto-join creation failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn in_cooldown(
        &self,
        key: &ParticipantKey,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<bool> {
        let cooldown = self.config.rejoin_cooldown();
        if cooldown.is_zero() {
            return Ok(false);
        }
        let latest = self.sessions.find_latest_by_key(key).await?;
        Ok(latest
            .and_then(|s| s.end_time)
            .is_some_and(|ended| now - ended < cooldown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tandem_core::clock::ManualClock;
    use tandem_core::config::SessionConfig;
    use tandem_database::memory::{MemoryFriendGraph, MemoryPresenceStore, MemorySessionStore};

    struct Fixture {
        clock: Arc<ManualClock>,
        presence: Arc<MemoryPresenceStore>,
        graph: MemoryFriendGraph,
        coordinator: Arc<SessionCoordinator>,
        detector: AutoJoinDetector,
    }

    fn fixture(config: AutoJoinConfig) -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = Arc::new(MemorySessionStore::new());
        let presence = Arc::new(MemoryPresenceStore::new());
        let graph = MemoryFriendGraph::new();
        let coordinator = Arc::new(SessionCoordinator::new(
            sessions.clone(),
            clock.clone(),
            SessionConfig::default(),
        ));
        let detector = AutoJoinDetector::new(
            coordinator.clone(),
            sessions,
            presence.clone(),
            Arc::new(graph.clone()),
            clock.clone(),
            PresenceConfig::default(),
            config,
        );
        Fixture {
            clock,
            presence,
            graph,
            coordinator,
            detector,
        }
    }

    fn ordered_pair() -> (UserId, UserId) {
        let (a, b) = (UserId::new(), UserId::new());
        if a < b { (a, b) } else { (b, a) }
    }

    #[tokio::test]
    async fn test_lower_id_creates_for_online_friend() {
        let f = fixture(AutoJoinConfig::default());
        let (lo, hi) = ordered_pair();
        f.graph.befriend(lo, hi);
        f.presence.touch(hi, f.clock.now()).await.unwrap();
        f.presence.touch(lo, f.clock.now()).await.unwrap();

        let report = f.detector.on_heartbeat(lo).await.unwrap();
        assert_eq!(report.created.len(), 1);

        let session = f.coordinator.find_active_for_pair(lo, hi).await.unwrap().unwrap();
        assert_eq!(session.origin, SessionOrigin::AutoJoin);
        assert_eq!(
            session.planned_end_time - session.start_time,
            Duration::minutes(60)
        );
    }

    #[tokio::test]
    async fn test_higher_id_never_creates() {
        let f = fixture(AutoJoinConfig::default());
        let (lo, hi) = ordered_pair();
        f.graph.befriend(lo, hi);
        f.presence.touch(lo, f.clock.now()).await.unwrap();

        let report = f.detector.on_heartbeat(hi).await.unwrap();
        assert_eq!(report.skipped_not_leader, 1);
        assert!(report.created.is_empty());
    }

    #[tokio::test]
    async fn test_offline_friend_is_ignored() {
        let f = fixture(AutoJoinConfig::default());
        let (lo, hi) = ordered_pair();
        f.graph.befriend(lo, hi);
        f.presence
            .touch(hi, f.clock.now() - Duration::seconds(61))
            .await
            .unwrap();

        let report = f.detector.on_heartbeat(lo).await.unwrap();
        assert_eq!(report, DetectionReport::default());
    }

    #[tokio::test]
    async fn test_existing_session_is_left_alone() {
        let f = fixture(AutoJoinConfig::default());
        let (lo, hi) = ordered_pair();
        f.graph.befriend(lo, hi);
        f.presence.touch(hi, f.clock.now()).await.unwrap();

        f.detector.on_heartbeat(lo).await.unwrap();
        let report = f.detector.on_heartbeat(lo).await.unwrap();
        assert_eq!(report.skipped_existing, 1);
        assert!(report.created.is_empty());
    }

    #[tokio::test]
    async fn test_cooldown_blocks_immediate_rejoin() {
        let f = fixture(AutoJoinConfig::default());
        let (lo, hi) = ordered_pair();
        f.graph.befriend(lo, hi);
        f.presence.touch(hi, f.clock.now()).await.unwrap();

        let created = f.detector.on_heartbeat(lo).await.unwrap().created;
        f.coordinator.end(created[0], hi, None, None).await.unwrap();

        f.clock.advance(Duration::seconds(30));
        f.presence.touch(hi, f.clock.now()).await.unwrap();
        let report = f.detector.on_heartbeat(lo).await.unwrap();
        assert_eq!(report.skipped_cooldown, 1);

        f.clock.advance(Duration::seconds(300));
        f.presence.touch(hi, f.clock.now()).await.unwrap();
        let report = f.detector.on_heartbeat(lo).await.unwrap();
        assert_eq!(report.created.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_detector_does_nothing() {
        let f = fixture(AutoJoinConfig {
            enabled: false,
            ..AutoJoinConfig::default()
        });
        let (lo, hi) = ordered_pair();
        f.graph.befriend(lo, hi);
        f.presence.touch(hi, f.clock.now()).await.unwrap();

        let report = f.detector.on_heartbeat(lo).await.unwrap();
        assert!(report.created.is_empty());
        assert!(f.coordinator.find_active_for_pair(lo, hi).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_leaders_create_exactly_one_session() {
        let f = fixture(AutoJoinConfig::default());
        let (lo, hi) = ordered_pair();
        f.graph.befriend(lo, hi);
        f.presence.touch(hi, f.clock.now()).await.unwrap();
        f.presence.touch(lo, f.clock.now()).await.unwrap();

        let detector = Arc::new(f.detector);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let d = detector.clone();
                tokio::spawn(async move { d.on_heartbeat(lo).await })
            })
            .collect();

        let created: usize = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap().created.len())
            .sum();
        assert_eq!(created, 1);
    }
}
