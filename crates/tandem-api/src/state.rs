//! Application state shared across all handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use tandem_auth::jwt::JwtDecoder;
use tandem_core::clock::Clock;
use tandem_core::config::AppConfig;
use tandem_database::StoreBackend;
use tandem_realtime::{PresenceSnapshotSource, RealtimeEngine, SessionSnapshotSource};
use tandem_service::{AutoJoinDetector, PresenceHeartbeatService, SessionCoordinator};

/// Shared application state available to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Backing stores.
    pub stores: StoreBackend,
    /// Bearer-token decoder.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Heartbeats and online status.
    pub presence: Arc<PresenceHeartbeatService>,
    /// Session lifecycle.
    pub sessions: Arc<SessionCoordinator>,
    /// Push feeds.
    pub realtime: Arc<RealtimeEngine>,
    /// Server start time.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the services over `stores`.
    pub fn new(config: AppConfig, stores: StoreBackend, clock: Arc<dyn Clock>) -> Self {
        let sessions = Arc::new(SessionCoordinator::new(
            stores.sessions.clone(),
            clock.clone(),
            config.session.clone(),
        ));

        let mut presence = PresenceHeartbeatService::new(
            stores.presence.clone(),
            stores.friends.clone(),
            clock.clone(),
            config.presence.clone(),
        );
        if config.session.auto_join.enabled {
            let detector = AutoJoinDetector::new(
                sessions.clone(),
                stores.sessions.clone(),
                stores.presence.clone(),
                stores.friends.clone(),
                clock.clone(),
                config.presence.clone(),
                config.session.auto_join.clone(),
            );
            presence = presence.with_detector(Arc::new(detector));
        }
        let presence = Arc::new(presence);

        let realtime = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            Arc::new(SessionSnapshotSource::new(sessions.clone())),
            Arc::new(PresenceSnapshotSource::new(presence.clone(), clock.clone())),
        ));

        info!(
            auto_join = config.session.auto_join.enabled,
            "Application services initialized"
        );

        Self {
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            started_at: clock.now(),
            config: Arc::new(config),
            stores,
            presence,
            sessions,
            realtime,
        }
    }
}
