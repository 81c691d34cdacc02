//! Store backend selection.

use std::sync::Arc;

use tracing::info;

use tandem_core::config::{DatabaseConfig, StoreProvider};
use tandem_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::{MemoryFriendGraph, MemoryPresenceStore, MemorySessionStore};
use crate::migration::run_migrations;
use crate::repositories::{FriendRepository, PresenceRepository, SessionRepository};
use crate::traits::{FriendGraph, PresenceStore, SessionStore};

/// The set of stores the services run against.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreBackend {
    /// Presence records.
    pub presence: Arc<dyn PresenceStore>,
    /// Sessions and participants.
    pub sessions: Arc<dyn SessionStore>,
    /// Friend relation.
    pub friends: Arc<dyn FriendGraph>,
    /// The pool, when backed by PostgreSQL.
    pub pool: Option<DatabasePool>,
}

impl StoreBackend {
    /// Build the configured backend, running migrations if requested.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider {
            StoreProvider::Postgres => {
                info!("Initializing PostgreSQL store provider");
                let db = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(db.pool()).await?;
                }
                Ok(Self::postgres(db))
            }
            StoreProvider::Memory => {
                info!(
                    friendships = config.memory_friendships.len(),
                    "Initializing in-memory store provider"
                );
                Ok(Self::memory(MemoryFriendGraph::from_pairs(
                    &config.memory_friendships,
                )))
            }
        }
    }

    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(db: DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            presence: Arc::new(PresenceRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            friends: Arc::new(FriendRepository::new(pool)),
            pool: Some(db),
        }
    }

    /// In-memory stores around the given friend graph.
    pub fn memory(friends: MemoryFriendGraph) -> Self {
        Self {
            presence: Arc::new(MemoryPresenceStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            friends: Arc::new(friends),
            pool: None,
        }
    }

    /// Assemble a backend from explicit parts.
    pub fn from_parts(
        presence: Arc<dyn PresenceStore>,
        sessions: Arc<dyn SessionStore>,
        friends: Arc<dyn FriendGraph>,
    ) -> Self {
        Self {
            presence,
            sessions,
            friends,
            pool: None,
        }
    }

    /// Close the pool, if any.
    pub async fn close(&self) {
        if let Some(db) = &self.pool {
            db.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::config::FriendPair;
    use tandem_core::types::UserId;

    #[tokio::test]
    async fn test_memory_backend_seeds_friendships() {
        let (a, b) = (UserId::new(), UserId::new());
        let config = DatabaseConfig {
            memory_friendships: vec![FriendPair { a, b }],
            ..DatabaseConfig::default()
        };

        let backend = StoreBackend::connect(&config).await.unwrap();
        assert!(backend.pool.is_none());
        assert_eq!(backend.friends.friends_of(b).await.unwrap(), vec![a]);
        assert!(backend.sessions.health_check().await.unwrap());
    }
}
