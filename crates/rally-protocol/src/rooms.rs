//! Room directory messages.
//!
//! The directory coordinator pushes the complete room list as a bare JSON
//! array whenever any room changes.

use serde::{Deserialize, Serialize};

/// A user shown in a room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
    /// User identifier.
    pub id: String,
    /// Display name, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Avatar URL, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Whether the user is currently connected.
    #[serde(default)]
    pub present: bool,
}

/// Summary of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Room identifier.
    pub id: String,
    /// Live connection count.
    #[serde(default)]
    pub connections: u32,
    /// Known users.
    #[serde(default)]
    pub users: Vec<RoomUser>,
}

impl RoomInfo {
    /// Create an empty room entry.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connections: 0,
            users: Vec::new(),
        }
    }
}
