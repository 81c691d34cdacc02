//! In-memory friend graph.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use tandem_core::config::FriendPair;
use tandem_core::result::AppResult;
use tandem_core::types::UserId;

use crate::traits::FriendGraph;

/// Undirected friend relation held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFriendGraph {
    edges: Arc<DashMap<UserId, HashSet<UserId>>>,
}

impl MemoryFriendGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from configured pairs.
    pub fn from_pairs(pairs: &[FriendPair]) -> Self {
        let graph = Self::new();
        for pair in pairs {
            graph.befriend(pair.a, pair.b);
        }
        graph
    }

    /// Record a friendship in both directions. Self-edges are ignored.
    pub fn befriend(&self, a: UserId, b: UserId) {
        if a == b {
            return;
        }
        self.edges.entry(a).or_default().insert(b);
        self.edges.entry(b).or_default().insert(a);
    }

    /// Remove a friendship in both directions.
    pub fn unfriend(&self, a: UserId, b: UserId) {
        if let Some(mut set) = self.edges.get_mut(&a) {
            set.remove(&b);
        }
        if let Some(mut set) = self.edges.get_mut(&b) {
            set.remove(&a);
        }
    }
}

#[async_trait]
impl FriendGraph for MemoryFriendGraph {
    async fn friends_of(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let mut friends: Vec<UserId> = self
            .edges
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        friends.sort();
        Ok(friends)
    }
}
