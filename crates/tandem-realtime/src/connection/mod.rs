//! Live feed bookkeeping.

pub mod handle;
pub mod registry;

pub use handle::FeedHandle;
pub use registry::ConnectionRegistry;
