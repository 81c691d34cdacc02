//! Handle to one running feed.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use tandem_core::types::{ConnectionId, UserId};

use crate::message::FeedKind;

/// A registered feed and the token that stops it.
#[derive(Debug)]
pub struct FeedHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User who owns the feed.
    pub user_id: UserId,
    /// Feed kind.
    pub kind: FeedKind,
    /// When the feed was opened.
    pub opened_at: DateTime<Utc>,
    token: CancellationToken,
}

impl FeedHandle {
    /// Creates a handle around `token`.
    pub fn new(user_id: UserId, kind: FeedKind, token: CancellationToken) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            kind,
            opened_at: Utc::now(),
            token,
        }
    }

    /// Token observed by the feed task and the transport.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the feed.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the feed has been stopped.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
