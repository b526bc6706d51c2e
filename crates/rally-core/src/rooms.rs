//! Room directory mirror.
//!
//! The directory broadcasts the complete room list on every change; the
//! mirror simply swaps it in.

use rally_protocol::RoomInfo;
use std::sync::Arc;
use tracing::debug;

use crate::view::{ConnectionState, RoomsView};

/// Client-side mirror of the room directory.
#[derive(Debug, Clone, Default)]
pub struct RoomDirectory {
    rooms: Arc<Vec<RoomInfo>>,
    connection: ConnectionState,
}

impl RoomDirectory {
    /// Create a directory from the list rendered before the channel connects.
    #[must_use]
    pub fn from_snapshot(rooms: Vec<RoomInfo>) -> Self {
        Self {
            rooms: Arc::new(rooms),
            connection: ConnectionState::Connecting,
        }
    }

    /// Replace the room list.
    pub fn apply(&mut self, rooms: Vec<RoomInfo>) {
        debug!(rooms = rooms.len(), "Rooms: list replaced");
        self.rooms = Arc::new(rooms);
    }

    /// Update the channel status.
    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    /// Snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> RoomsView {
        RoomsView {
            rooms: Arc::clone(&self.rooms),
            connection: self.connection,
        }
    }
}
