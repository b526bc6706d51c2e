//! # rally-protocol
//!
//! Wire protocol definitions for the rally presence and session pipelines.
//!
//! Every frame is a UTF-8 JSON text message exchanged with a room-scoped
//! coordinator. This crate types those messages and provides the codec.
//!
//! ## Message Kinds
//!
//! - Presence: `sync` / `update` / `remove` inbound, bare cursor samples outbound
//! - Session: full board broadcasts inbound, `set` attempts outbound
//! - Rooms: full room list broadcasts inbound
//!
//! ## Example
//!
//! ```rust
//! use rally_protocol::{codec, PresenceMessage};
//!
//! let frame = r#"{"type":"remove","id":"agent-7"}"#;
//! let message = codec::decode_presence(frame).unwrap();
//! assert_eq!(message, Some(PresenceMessage::remove("agent-7")));
//!
//! // Unknown kinds are ignored rather than rejected
//! assert_eq!(codec::decode_presence(r#"{"type":"wave"}"#).unwrap(), None);
//! ```

pub mod codec;
pub mod presence;
pub mod rooms;
pub mod session;

pub use codec::{
    decode_presence, decode_room_list, decode_session, encode_cursor, encode_set_attempt,
    ProtocolError,
};
pub use presence::{CursorIntent, CursorRecord, CursorsMap, PointerKind, PresenceMessage};
pub use rooms::{RoomInfo, RoomUser};
pub use session::{Board, Card, Row, SessionUpdate, SetAttempt};
