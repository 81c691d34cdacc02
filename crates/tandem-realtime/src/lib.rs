//! # tandem-realtime
//!
//! Push feeds for Tandem clients. Each open feed is a task that ticks on
//! a fixed cadence, queries a snapshot, and hands the frame to the
//! transport through a bounded channel:
//!
//! - `sessions`: the caller's active and recently ended sessions
//! - `presence`: the online status of the caller's friends
//!
//! Feeds stop on disconnect, on the first query error, or on shutdown.

pub mod connection;
pub mod engine;
pub mod feed;
pub mod message;
pub mod metrics;

pub use connection::registry::ConnectionRegistry;
pub use engine::{FeedSubscription, RealtimeEngine};
pub use feed::source::{PresenceSnapshotSource, SessionSnapshotSource, SnapshotSource};
pub use message::{FeedKind, OutboundFrame};
pub use metrics::{FeedMetrics, MetricsSnapshot};
