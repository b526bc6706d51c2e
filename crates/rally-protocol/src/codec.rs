//! Codec for decoding inbound frames and encoding outbound intents.
//!
//! Frames are UTF-8 JSON text. Decoders return `Ok(None)` for message kinds
//! this client does not recognize so the coordinator protocol can grow
//! without breaking older clients.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::presence::{CursorIntent, PresenceMessage};
use crate::rooms::RoomInfo;
use crate::session::{SessionUpdate, SetAttempt, UPDATE_TYPE};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON syntax or shape error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON that does not match the expected message shape.
    #[error("Invalid frame: {0}")]
    Invalid(String),
}

/// Decode an inbound presence frame.
///
/// # Errors
///
/// Returns an error if the frame is not JSON, has no `type`, or a known
/// message kind is missing fields.
pub fn decode_presence(raw: &str) -> Result<Option<PresenceMessage>, ProtocolError> {
    match serde_json::from_str::<PresenceMessage>(raw)? {
        PresenceMessage::Unknown => {
            trace!("Ignoring unknown presence message kind");
            Ok(None)
        }
        message => Ok(Some(message)),
    }
}

/// Encode an outbound cursor intent.
///
/// # Errors
///
/// Returns an error if serialization fails (non-finite coordinates).
pub fn encode_cursor(intent: &CursorIntent) -> Result<String, ProtocolError> {
    if let CursorIntent::Move { x, y, .. } = intent {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProtocolError::Invalid(format!(
                "non-finite cursor position ({x}, {y})"
            )));
        }
    }
    Ok(serde_json::to_string(intent)?)
}

/// Decode an inbound session frame.
///
/// # Errors
///
/// Returns an error if the frame is not JSON or lacks `cards`/`score`.
pub fn decode_session(raw: &str) -> Result<Option<SessionUpdate>, ProtocolError> {
    let value: Value = serde_json::from_str(raw)?;

    if !value.is_object() {
        return Err(ProtocolError::Invalid("session frame is not an object".into()));
    }

    if let Some(kind) = value.get("type") {
        if kind.as_str() != Some(UPDATE_TYPE) {
            trace!(kind = %kind, "Ignoring unknown session message kind");
            return Ok(None);
        }
    }

    Ok(Some(SessionUpdate::deserialize(value)?))
}

/// Encode an outbound set attempt.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_set_attempt(attempt: &SetAttempt) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(attempt)?)
}

/// Decode an inbound room directory frame.
///
/// # Errors
///
/// Returns an error if the frame is not a JSON array of rooms.
pub fn decode_room_list(raw: &str) -> Result<Vec<RoomInfo>, ProtocolError> {
    Ok(serde_json::from_str(raw)?)
}
