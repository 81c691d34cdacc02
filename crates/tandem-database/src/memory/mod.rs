//! In-process store implementations.
//!
//! Suitable for a single node and for tests. Each store holds its state
//! behind shared handles, so clones observe the same data.

pub mod friend;
pub mod presence;
pub mod session;

pub use friend::MemoryFriendGraph;
pub use presence::MemoryPresenceStore;
pub use session::MemorySessionStore;
