//! # tandem-database
//!
//! Store abstractions for presence, sessions and the friend graph, with
//! a PostgreSQL implementation and an in-process implementation behind
//! the same traits.

pub mod backend;
pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod traits;

pub use backend::StoreBackend;
pub use connection::DatabasePool;
pub use traits::{FriendGraph, PresenceStore, SessionStore};
