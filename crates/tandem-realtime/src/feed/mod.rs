//! Snapshot sources and the per-connection feed loop.

pub mod runner;
pub mod source;

pub use runner::{FeedExit, FeedSettings, run_feed};
pub use source::{PresenceSnapshotSource, SessionSnapshotSource, SnapshotSource};
