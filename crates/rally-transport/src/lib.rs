//! # rally-transport
//!
//! Channel abstraction for rally pipelines.
//!
//! Every pipeline talks to its room through one persistent text channel:
//!
//! - **WebSocket** - the real coordinator connection (`ws`/`wss`)
//! - **Memory** - in-process queues for tests and demos
//!
//! ## Transport Abstraction
//!
//! All transports implement the [`Transport`] and [`Channel`] traits, so
//! the pipelines never depend on the wire.
//!
//! ```rust,ignore
//! use rally_transport::{Channel, RoomAddress, Transport};
//!
//! async fn pump(transport: &dyn Transport, address: &RoomAddress) {
//!     let mut channel = transport.connect(address).await?;
//!     while let Ok(Some(text)) = channel.recv().await {
//!         // Decode and apply
//!     }
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use memory::{MemoryTransport, RemotePeer};
pub use traits::{Channel, ChannelState, ConnectionId, RoomAddress, Transport, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketTransport};
