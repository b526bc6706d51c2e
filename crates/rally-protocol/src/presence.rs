//! Presence messages.
//!
//! The presence coordinator speaks a small JSON protocol: inbound messages
//! carry a `type` tag, outbound cursor samples carry none (the coordinator
//! infers intent from the channel).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The input device that produced a cursor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Mouse,
    Touch,
}

/// A remote agent's cursor as broadcast by the coordinator.
///
/// Coordinates are fractions of the sender's viewport, not pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorRecord {
    /// Horizontal position in `[0, 1]`.
    pub x: f64,
    /// Vertical position in `[0, 1]`.
    pub y: f64,
    /// Country code resolved by the coordinator, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Coordinator timestamp of the last sample (milliseconds since epoch).
    #[serde(default)]
    pub last_update: u64,
    /// Device that produced the sample.
    pub pointer: PointerKind,
}

/// Mapping of agent id to cursor record.
pub type CursorsMap = HashMap<String, CursorRecord>;

/// An inbound presence message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PresenceMessage {
    /// Full resync of every other agent's cursor.
    Sync {
        /// All known cursors, keyed by agent id.
        cursors: CursorsMap,
    },

    /// A single agent moved.
    Update {
        /// Agent id.
        id: String,
        /// Horizontal position.
        x: f64,
        /// Vertical position.
        y: f64,
        /// Optional country code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        country: Option<String>,
        /// Coordinator timestamp.
        #[serde(default, rename = "lastUpdate")]
        last_update: u64,
        /// Device kind.
        pointer: PointerKind,
    },

    /// An agent left.
    Remove {
        /// Agent id.
        id: String,
    },

    /// Any kind this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl PresenceMessage {
    /// Create an update message from a cursor record.
    #[must_use]
    pub fn update(id: impl Into<String>, cursor: CursorRecord) -> Self {
        PresenceMessage::Update {
            id: id.into(),
            x: cursor.x,
            y: cursor.y,
            country: cursor.country,
            last_update: cursor.last_update,
            pointer: cursor.pointer,
        }
    }

    /// Create a remove message.
    #[must_use]
    pub fn remove(id: impl Into<String>) -> Self {
        PresenceMessage::Remove { id: id.into() }
    }

    /// Name of the message kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PresenceMessage::Sync { .. } => "sync",
            PresenceMessage::Update { .. } => "update",
            PresenceMessage::Remove { .. } => "remove",
            PresenceMessage::Unknown => "unknown",
        }
    }
}

/// An outbound cursor intent.
///
/// `Move` encodes as `{"x":..,"y":..,"pointer":..}`, `Idle` as `{}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorIntent {
    /// The local pointer moved.
    Move {
        /// Normalized horizontal position.
        x: f64,
        /// Normalized vertical position.
        y: f64,
        /// Device kind.
        pointer: PointerKind,
    },

    /// The local agent went idle (touch ended).
    Idle {},
}

impl CursorIntent {
    /// Whether this is the idle signal.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, CursorIntent::Idle {})
    }
}
