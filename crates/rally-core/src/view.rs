//! Read-only views handed to rendering.
//!
//! Views are immutable snapshots. Each state machine produces a fresh view
//! after every transition; renderers never observe a half-applied update and
//! can only change state through the client intents.

use rally_protocol::{Board, CursorsMap, RoomInfo};
use std::sync::Arc;

use crate::presence::{LocalCursor, Viewport};

/// Connection status of a pipeline's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// The channel is being opened.
    #[default]
    Connecting,
    /// The channel is open.
    Open,
    /// The channel is closed or unreachable.
    Closed,
}

impl ConnectionState {
    /// Whether the channel is open.
    #[must_use]
    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }

    /// Label for status indicators and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the presence pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresenceView {
    /// Every other connected agent's cursor.
    pub others: Arc<CursorsMap>,
    /// The local cursor, once a pointer sample has been taken.
    pub my_cursor: Option<LocalCursor>,
    /// The id assigned by the transport, once connected.
    pub my_id: Option<String>,
    /// Current local viewport dimensions.
    pub viewport: Viewport,
    /// Channel status.
    pub connection: ConnectionState,
}

impl PresenceView {
    /// Number of agents in the room, including the local one while connected.
    ///
    /// The local agent counts as soon as the channel is open, even before it
    /// has sent a cursor sample.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.others.len() + usize::from(self.connection.is_open())
    }
}

/// Snapshot of the session (match game) pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    /// Board as last broadcast by the coordinator.
    pub board: Arc<Board>,
    /// Score as last broadcast by the coordinator.
    pub score: u64,
    /// Locally selected card ids, in selection order.
    pub selection: Vec<String>,
    /// Cards currently pulsing as a local match.
    pub win_flash: Vec<String>,
    /// Cards currently pulsing as a local miss.
    pub lose_flash: Vec<String>,
    /// Channel status.
    pub connection: ConnectionState,
}

impl SessionView {
    /// Whether a card is selected.
    #[must_use]
    pub fn is_selected(&self, card_id: &str) -> bool {
        self.selection.iter().any(|id| id == card_id)
    }

    /// Whether a card is flashing as a match.
    #[must_use]
    pub fn is_win_flash(&self, card_id: &str) -> bool {
        self.win_flash.iter().any(|id| id == card_id)
    }

    /// Whether a card is flashing as a miss.
    #[must_use]
    pub fn is_lose_flash(&self, card_id: &str) -> bool {
        self.lose_flash.iter().any(|id| id == card_id)
    }
}

/// Snapshot of the room directory pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomsView {
    /// Rooms as last broadcast.
    pub rooms: Arc<Vec<RoomInfo>>,
    /// Channel status.
    pub connection: ConnectionState,
}

impl RoomsView {
    /// Total connections across all rooms.
    #[must_use]
    pub fn total_connections(&self) -> u64 {
        self.rooms.iter().map(|room| u64::from(room.connections)).sum()
    }
}
