//! Session lifecycle status and origin enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a focus session.
///
/// Transitions are monotonic: `Active → Completed | Cancelled`, and a
/// terminal status never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Running; participants may pause, resume, and end it.
    Active,
    /// Ended normally by a participant.
    Completed,
    /// Abandoned by a participant.
    Cancelled,
}

impl SessionStatus {
    /// Check if the session is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Active => false,
            Self::Completed | Self::Cancelled => true,
        }
    }

    /// Whether a transition from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match (self, next) {
            (Self::Active, Self::Completed | Self::Cancelled) => true,
            (Self::Active, Self::Active) => false,
            (Self::Completed | Self::Cancelled, _) => false,
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a session came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_origin", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    /// Created through the API by a participant.
    Manual,
    /// Created by the auto-join detector for two online friends.
    AutoJoin,
}

impl SessionOrigin {
    /// Return the origin as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoJoin => "auto_join",
        }
    }
}

impl fmt::Display for SessionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
