//! Snapshot sources backing each feed kind.

use std::sync::Arc;

use async_trait::async_trait;

use tandem_core::clock::Clock;
use tandem_core::result::AppResult;
use tandem_core::types::UserId;
use tandem_service::{PresenceHeartbeatService, SessionCoordinator};

use crate::message::{FeedKind, OutboundFrame};

/// Produces the current frame for one user.
#[async_trait]
pub trait SnapshotSource: Send + Sync + std::fmt::Debug + 'static {
    /// Which feed this source serves.
    fn kind(&self) -> FeedKind;

    /// Query the current snapshot for `user_id`.
    async fn snapshot(&self, user_id: UserId) -> AppResult<OutboundFrame>;
}

/// Active and recently ended sessions of the user.
#[derive(Debug, Clone)]
pub struct SessionSnapshotSource {
    coordinator: Arc<SessionCoordinator>,
}

impl SessionSnapshotSource {
    /// Creates a new session source.
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl SnapshotSource for SessionSnapshotSource {
    fn kind(&self) -> FeedKind {
        FeedKind::Sessions
    }

    async fn snapshot(&self, user_id: UserId) -> AppResult<OutboundFrame> {
        let snapshot = self.coordinator.active_snapshot(user_id).await?;
        Ok(OutboundFrame::Sessions { snapshot })
    }
}

/// Online status of the user's friends.
#[derive(Debug, Clone)]
pub struct PresenceSnapshotSource {
    presence: Arc<PresenceHeartbeatService>,
    clock: Arc<dyn Clock>,
}

impl PresenceSnapshotSource {
    /// Creates a new presence source.
    pub fn new(presence: Arc<PresenceHeartbeatService>, clock: Arc<dyn Clock>) -> Self {
        Self { presence, clock }
    }
}

#[async_trait]
impl SnapshotSource for PresenceSnapshotSource {
    fn kind(&self) -> FeedKind {
        FeedKind::Presence
    }

    async fn snapshot(&self, user_id: UserId) -> AppResult<OutboundFrame> {
        let friends = self.presence.friends_presence(user_id).await?;
        Ok(OutboundFrame::Presence {
            as_of: self.clock.now(),
            friends,
        })
    }
}
