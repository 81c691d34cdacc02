//! PostgreSQL store implementations.

pub mod friend;
pub mod presence;
pub mod session;

pub use friend::FriendRepository;
pub use presence::PresenceRepository;
pub use session::SessionRepository;

use tandem_core::error::{AppError, ErrorKind};

/// Map a sqlx error into the application error space.
///
/// Unique violations become `Conflict`; everything else is treated as the
/// store being unavailable.
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> AppError {
    let unique = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AppError::with_source(ErrorKind::Conflict, format!("{context}: duplicate"), err)
    } else {
        AppError::with_source(ErrorKind::Transient, context.to_string(), err)
    }
}
