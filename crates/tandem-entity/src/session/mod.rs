//! Focus session domain entities.

pub mod model;
pub mod participant;
pub mod status;
pub mod view;

pub use model::{FocusSession, NewFocusSession, ParticipantKey, SessionTermination};
pub use participant::{SessionParticipant, aggregate_paused};
pub use status::{SessionOrigin, SessionStatus};
pub use view::{EndOutcome, PauseResult, SessionStatusView, SessionsSnapshot};
