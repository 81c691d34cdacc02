//! # tandem-service
//!
//! Coordination services for Tandem. Services hold their stores and
//! clock as `Arc` handles injected at construction time; the HTTP and
//! realtime layers call into them and never touch the stores directly.

pub mod presence;
pub mod session;

pub use presence::{HeartbeatAck, PresenceHeartbeatService};
pub use session::{AutoJoinDetector, DetectionReport, SessionCoordinator};
