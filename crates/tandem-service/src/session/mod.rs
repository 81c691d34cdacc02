//! Focus session services.

pub mod auto_join;
pub mod coordinator;

pub use auto_join::{AutoJoinDetector, DetectionReport};
pub use coordinator::SessionCoordinator;
