//! Registry of live feeds, indexed by connection and by user.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tandem_core::types::{ConnectionId, UserId};

use super::handle::FeedHandle;
use crate::message::FeedKind;
use crate::metrics::FeedMetrics;

/// Thread-safe registry of every open feed.
///
/// Each feed's token is a child of the registry's root token, so
/// [`close_all`](Self::close_all) stops every feed at once.
#[derive(Debug)]
pub struct ConnectionRegistry {
    by_id: DashMap<ConnectionId, Arc<FeedHandle>>,
    by_user: DashMap<UserId, Vec<ConnectionId>>,
    root: CancellationToken,
    max_feeds_per_user: usize,
    metrics: Arc<FeedMetrics>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(max_feeds_per_user: usize, metrics: Arc<FeedMetrics>) -> Self {
        Self {
            by_id: DashMap::new(),
            by_user: DashMap::new(),
            root: CancellationToken::new(),
            max_feeds_per_user: max_feeds_per_user.max(1),
            metrics,
        }
    }

    /// Registers a feed for `user_id`.
    ///
    /// When the user is at the cap, their oldest feed is cancelled to make
    /// room.
    pub fn register(&self, user_id: UserId, kind: FeedKind) -> Arc<FeedHandle> {
        let handle = Arc::new(FeedHandle::new(user_id, kind, self.root.child_token()));

        let evicted = {
            let mut ids = self.by_user.entry(user_id).or_default();
            let evicted = if ids.len() >= self.max_feeds_per_user {
                Some(ids.remove(0))
            } else {
                None
            };
            ids.push(handle.id);
            evicted
        };

        if let Some(old_id) = evicted {
            if let Some((_, old)) = self.by_id.remove(&old_id) {
                warn!(
                    conn_id = %old_id,
                    user_id = %user_id,
                    max = self.max_feeds_per_user,
                    "User at max feeds, closing oldest"
                );
                old.cancel();
                self.metrics.feed_evicted();
                self.metrics.feed_closed();
            }
        }

        self.by_id.insert(handle.id, handle.clone());
        self.metrics.feed_opened();
        info!(conn_id = %handle.id, user_id = %user_id, feed = %kind, "Feed registered");
        handle
    }

    /// Removes a feed and cancels it. Unknown IDs are ignored.
    pub fn unregister(&self, conn_id: ConnectionId) {
        let Some((_, handle)) = self.by_id.remove(&conn_id) else {
            return;
        };
        handle.cancel();

        if let Some(mut ids) = self.by_user.get_mut(&handle.user_id) {
            ids.retain(|id| *id != conn_id);
            if ids.is_empty() {
                drop(ids);
                self.by_user.remove_if(&handle.user_id, |_, ids| ids.is_empty());
            }
        }

        self.metrics.feed_closed();
        info!(conn_id = %conn_id, user_id = %handle.user_id, "Feed unregistered");
    }

    /// Fetch a feed handle.
    pub fn get(&self, conn_id: ConnectionId) -> Option<Arc<FeedHandle>> {
        self.by_id.get(&conn_id).map(|h| h.value().clone())
    }

    /// Feeds currently open for `user_id`.
    pub fn user_feeds(&self, user_id: UserId) -> usize {
        self.by_user.get(&user_id).map(|ids| ids.len()).unwrap_or(0)
    }

    /// Total open feeds.
    pub fn total_feeds(&self) -> usize {
        self.by_id.len()
    }

    /// Distinct users with at least one open feed.
    pub fn unique_users(&self) -> usize {
        self.by_user.len()
    }

    /// Cancel every feed, including ones registered afterwards.
    pub fn close_all(&self) {
        let open = self.by_id.len();
        self.root.cancel();
        info!(feeds = open, "All feeds cancelled");
    }

    /// Whether [`close_all`](Self::close_all) has run.
    pub fn is_closed(&self) -> bool {
        self.root.is_cancelled()
    }
}
