//! Store traits shared by the PostgreSQL and in-memory backends.

pub mod friend;
pub mod presence;
pub mod session;

pub use friend::FriendGraph;
pub use presence::PresenceStore;
pub use session::SessionStore;
