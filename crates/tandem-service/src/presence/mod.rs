//! Presence services.

pub mod heartbeat;

pub use heartbeat::{HeartbeatAck, PresenceHeartbeatService};
