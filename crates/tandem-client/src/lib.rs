//! # tandem-client
//!
//! Client-side half of Tandem: keeps a device's view of the shared
//! session in step with the server.
//!
//! - [`ClientReconciler`]: pure state machine over local sensor input and
//!   server snapshots.
//! - [`PauseDebouncer`]: coalesces rapid local pause flips.
//! - [`SessionApi`] / [`HttpSessionApi`]: the transport.
//! - [`PollDriver`]: polls, pushes pause changes and reconciles after
//!   every reconnect, backing off per [`ReconnectPolicy`].

pub mod api;
pub mod debounce;
pub mod driver;
pub mod reconciler;
pub mod reconnect;

pub use api::{HttpSessionApi, SessionApi};
pub use debounce::PauseDebouncer;
pub use driver::{ClientConfig, PollDriver};
pub use reconciler::{ClientReconciler, ClientView, DisplayStatus, FocusEntry, SessionSummary};
pub use reconnect::ReconnectPolicy;
