//! In-process transport.
//!
//! A [`MemoryTransport`] hands out channels whose other end is a
//! [`RemotePeer`] held by the caller. It stands in for the coordinator in
//! tests and local demos.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::traits::{
    Channel, ChannelState, ConnectionId, RoomAddress, Transport, TransportError,
};

/// Pending channel waiting for a `connect` call.
struct Pending {
    id: ConnectionId,
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

/// Transport backed by in-process queues.
#[derive(Default)]
pub struct MemoryTransport {
    rooms: DashMap<String, Pending>,
}

impl MemoryTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a room reachable for the next `connect`.
    ///
    /// The returned peer plays the coordinator side of that channel. Opening
    /// the same room again replaces a channel nobody has connected to yet.
    pub fn open(&self, address: &RoomAddress, id: impl Into<ConnectionId>) -> RemotePeer {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let id = id.into();

        self.rooms.insert(
            address.key(),
            Pending {
                id: id.clone(),
                incoming,
                outgoing,
            },
        );

        RemotePeer {
            id,
            to_client: Some(to_client),
            from_client,
        }
    }

    /// Number of rooms opened but not yet connected.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rooms.len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, address: &RoomAddress) -> Result<Box<dyn Channel>, TransportError> {
        let (_, pending) = self
            .rooms
            .remove(&address.key())
            .ok_or_else(|| TransportError::Unreachable(address.key()))?;

        debug!(room = %address, connection = %pending.id, "Memory channel open");

        Ok(Box::new(MemoryChannel {
            id: pending.id,
            incoming: pending.incoming,
            outgoing: Some(pending.outgoing),
            state: ChannelState::Open,
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Client end of an in-process channel.
pub struct MemoryChannel {
    id: ConnectionId,
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    state: ChannelState,
}

#[async_trait]
impl Channel for MemoryChannel {
    fn assigned_id(&self) -> &ConnectionId {
        &self.id
    }

    fn state(&self) -> ChannelState {
        self.state
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        if self.state == ChannelState::Closed {
            return Ok(None);
        }

        let frame = self.incoming.recv().await;
        if frame.is_none() {
            self.state = ChannelState::Closed;
            self.outgoing = None;
        }
        Ok(frame)
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let outgoing = self
            .outgoing
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?;
        outgoing
            .send(text)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state = ChannelState::Closed;
        self.outgoing = None;
        self.incoming.close();
        Ok(())
    }
}

/// Coordinator end of an in-process channel.
#[derive(Debug)]
pub struct RemotePeer {
    id: ConnectionId,
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl RemotePeer {
    /// Id assigned to the client end.
    #[must_use]
    pub fn client_id(&self) -> &ConnectionId {
        &self.id
    }

    /// Push a frame to the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client closed the channel or the peer
    /// disconnected.
    pub fn send(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.to_client
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?
            .send(text.into())
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Wait for the next frame from the client.
    ///
    /// Returns `None` once the client closed its end.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Take a frame from the client if one is queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Drop the server side; the client sees the channel close.
    pub fn disconnect(&mut self) {
        self.to_client = None;
    }

    /// Stop accepting frames; later client sends fail.
    pub fn stop_reading(&mut self) {
        self.from_client.close();
    }
}
