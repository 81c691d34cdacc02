//! Friend graph trait.

use async_trait::async_trait;

use tandem_core::result::AppResult;
use tandem_core::types::UserId;

/// Read access to the undirected friend relation.
#[async_trait]
pub trait FriendGraph: Send + Sync + std::fmt::Debug + 'static {
    /// All friends of `user_id`. Never contains `user_id` itself.
    async fn friends_of(&self, user_id: UserId) -> AppResult<Vec<UserId>>;
}
