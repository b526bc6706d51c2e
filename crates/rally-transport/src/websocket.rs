//! WebSocket transport implementation.
//!
//! Opens one client WebSocket per room using tokio-tungstenite. TLS is
//! provided by rustls with the webpki root store.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, warn};

use crate::traits::{
    Channel, ChannelState, ConnectionId, RoomAddress, Transport, TransportError,
};

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum inbound frame size in bytes. Larger frames are dropped.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1024 * 1024, // 1 MB
        }
    }
}

/// WebSocket transport.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    config: WebSocketConfig,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, address: &RoomAddress) -> Result<Box<dyn Channel>, TransportError> {
        let id = ConnectionId::generate();
        let url = address.url(&id);

        debug!(room = %address, %url, "Opening WebSocket");

        let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            error!(room = %address, error = %e, "WebSocket handshake failed");
            match e {
                WsError::Io(io) => TransportError::Unreachable(io.to_string()),
                other => TransportError::Handshake(other.to_string()),
            }
        })?;

        debug!(room = %address, connection = %id, "WebSocket open");

        Ok(Box::new(WebSocketChannel {
            id,
            stream,
            state: ChannelState::Open,
            max_message_size: self.config.max_message_size,
        }))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A client WebSocket to one room.
pub struct WebSocketChannel {
    id: ConnectionId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    state: ChannelState,
    max_message_size: usize,
}

impl WebSocketChannel {
    fn accept_text(&self, text: String) -> Option<String> {
        if text.len() > self.max_message_size {
            warn!(
                connection = %self.id,
                size = text.len(),
                max = self.max_message_size,
                "Dropping oversized frame"
            );
            return None;
        }
        Some(text)
    }
}

#[async_trait]
impl Channel for WebSocketChannel {
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

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(text) = self.accept_text(text) {
                        return Ok(Some(text));
                    }
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => {
                        if let Some(text) = self.accept_text(text) {
                            return Ok(Some(text));
                        }
                    }
                    Err(_) => warn!(connection = %self.id, "Ignoring non UTF-8 binary frame"),
                },
                // tungstenite queues the pong itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    debug!(connection = %self.id, "Received close frame");
                    self.state = ChannelState::Closed;
                    return Ok(None);
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    debug!(connection = %self.id, "WebSocket stream ended");
                    self.state = ChannelState::Closed;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!(connection = %self.id, error = %e, "WebSocket error");
                    self.state = ChannelState::Closed;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.state != ChannelState::Open {
            return Err(TransportError::ConnectionClosed);
        }

        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.state == ChannelState::Closed {
            return Ok(());
        }
        self.state = ChannelState::Closed;

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::SendFailed(format!("Failed to close: {e}"))),
        }
    }
}
