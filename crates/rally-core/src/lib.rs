//! # rally-core
//!
//! Client-side reconciliation for the rally presence and session pipelines.
//!
//! This crate turns the coordinator's message stream into a consistent local
//! view and turns local input into outbound intents:
//!
//! - **Presence** - Mirror of every other agent's cursor plus the local one
//! - **Session** - Read-only mirror of the game board and score
//! - **Selection** - Local card selection and set evaluation
//! - **Effects** - Timed win/lose flash flags
//! - **Rooms** - Mirror of the room directory
//! - **View** - Immutable snapshots for rendering
//!
//! Nothing here performs I/O. Callers feed decoded messages and local events
//! in, send the returned intents, and publish the resulting views.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Decoded   │────▶│   Mirror    │────▶│    View     │
//! │  messages   │     └─────────────┘     └─────────────┘
//! └─────────────┘            ▲
//!                            │ local events
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Selection  │────▶│   Intents   │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod effects;
pub mod game;
pub mod presence;
pub mod rooms;
pub mod rules;
pub mod selection;
pub mod session;
pub mod view;

#[cfg(test)]
mod proptests;

pub use effects::{EffectFlags, FlashKind, DEFAULT_FLASH_DURATION};
pub use game::{Evaluation, MatchGame};
pub use presence::{LocalCursor, PointerSample, PresenceMirror, Viewport};
pub use rooms::RoomDirectory;
pub use rules::{AttributeSetRule, SetRule};
pub use selection::{Selection, SelectionError, SET_SIZE};
pub use session::SessionMirror;
pub use view::{ConnectionState, PresenceView, RoomsView, SessionView};
