//! Transport abstraction traits for rally.
//!
//! A transport opens one persistent text channel per (party, room) pair.
//! The pipelines only see these traits, so they run unchanged over a real
//! WebSocket or an in-process channel.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Maximum length of a party or room name.
pub const MAX_SEGMENT_LENGTH: usize = 256;

/// Id the transport assigns to the local agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a connection ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random connection ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Nothing is listening at the address.
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// Party, room or host is not usable.
    #[error("Invalid address: {0}")]
    InvalidAddress(&'static str),

    /// The opening handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate a party or room name.
///
/// # Errors
///
/// Returns an error message if the name is empty, too long, contains a path
/// separator or is not printable ASCII.
pub fn validate_segment(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name cannot be empty");
    }
    if name.len() > MAX_SEGMENT_LENGTH {
        return Err("name too long");
    }
    if name.contains('/') {
        return Err("name cannot contain '/'");
    }
    if !name.chars().all(|c| c.is_ascii_graphic()) {
        return Err("name contains invalid characters");
    }
    Ok(())
}

/// Where a channel connects: a coordinator host, a party (feature) and a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomAddress {
    host: String,
    party: String,
    room: String,
}

impl RoomAddress {
    /// Create a room address.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty or a name is invalid.
    pub fn new(
        host: impl Into<String>,
        party: impl Into<String>,
        room: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let host = host.into();
        let party = party.into();
        let room = room.into();

        if host.trim().is_empty() {
            return Err(TransportError::InvalidAddress("host cannot be empty"));
        }
        validate_segment(&party).map_err(TransportError::InvalidAddress)?;
        validate_segment(&room).map_err(TransportError::InvalidAddress)?;

        Ok(Self { host, party, room })
    }

    /// Coordinator host (optionally with port or scheme).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Party (feature) name.
    #[must_use]
    pub fn party(&self) -> &str {
        &self.party
    }

    /// Room id.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Key identifying this room across transports.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.host, self.party, self.room)
    }

    /// WebSocket URL for this room, carrying the assigned id.
    ///
    /// Local development hosts use plain `ws`, everything else `wss`. An
    /// explicit `ws://`/`wss://`/`http://`/`https://` prefix on the host wins.
    #[must_use]
    pub fn url(&self, id: &ConnectionId) -> String {
        let (scheme, host) = split_scheme(&self.host);
        format!(
            "{scheme}://{host}/parties/{}/{}?_pk={id}",
            self.party, self.room
        )
    }
}

impl fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.party, self.room)
    }
}

fn split_scheme(host: &str) -> (&'static str, &str) {
    let host = host.trim_end_matches('/');
    for (prefix, scheme) in [
        ("wss://", "wss"),
        ("https://", "wss"),
        ("ws://", "ws"),
        ("http://", "ws"),
    ] {
        if let Some(rest) = host.strip_prefix(prefix) {
            return (scheme, rest);
        }
    }

    let local = ["localhost", "127.0.0.1", "0.0.0.0", "[::1]"]
        .iter()
        .any(|name| host == *name || host.starts_with(&format!("{name}:")));
    (if local { "ws" } else { "wss" }, host)
}

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Handshake in progress.
    Connecting,
    /// Ready to send and receive.
    Open,
    /// Closed by either side or failed.
    Closed,
}

/// A transport that can open room channels.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a channel to a room.
    async fn connect(&self, address: &RoomAddress) -> Result<Box<dyn Channel>, TransportError>;

    /// Get the transport name (e.g., "websocket", "memory").
    fn name(&self) -> &'static str;
}

/// An open, bidirectional text channel to one room.
#[async_trait]
pub trait Channel: Send {
    /// The id the coordinator knows the local agent by.
    fn assigned_id(&self) -> &ConnectionId;

    /// Current lifecycle state.
    fn state(&self) -> ChannelState;

    /// Receive the next text frame.
    ///
    /// Returns `None` once the channel is closed cleanly. Must be cancel
    /// safe: dropping the future before completion loses no frame.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Send a text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the channel gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the channel is still open.
    fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }
}
