//! Frames pushed to feed subscribers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tandem_entity::presence::PresenceView;
use tandem_entity::session::SessionsSnapshot;

/// Which snapshot a feed carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// The caller's sessions.
    Sessions,
    /// The caller's friends' presence.
    Presence,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sessions => write!(f, "sessions"),
            Self::Presence => write!(f, "presence"),
        }
    }
}

/// A message sent by the server on a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Session snapshot.
    Sessions {
        /// The snapshot.
        #[serde(flatten)]
        snapshot: SessionsSnapshot,
    },
    /// Friends' presence.
    Presence {
        /// Snapshot time.
        as_of: DateTime<Utc>,
        /// One entry per friend.
        friends: Vec<PresenceView>,
    },
    /// The feed failed and is about to close.
    Error {
        /// Error kind, e.g. `TRANSIENT`.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl OutboundFrame {
    /// Serialize for a text transport.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_tagged() {
        let frame = OutboundFrame::Error {
            code: "TRANSIENT".to_string(),
            message: "store unavailable".to_string(),
        };
        let json: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "TRANSIENT");

        let frame = OutboundFrame::Sessions {
            snapshot: SessionsSnapshot {
                as_of: Utc::now(),
                active: Vec::new(),
                recently_ended: Vec::new(),
            },
        };
        let json: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "sessions");
        assert!(json["active"].as_array().unwrap().is_empty());
    }
}
