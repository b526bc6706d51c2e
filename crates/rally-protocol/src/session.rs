//! Session (match game) messages.
//!
//! The game coordinator broadcasts the whole board and score on every change.
//! Clients propose matches with a set attempt and never patch the board.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Message tag the coordinator uses for set attempts.
pub const SET_ATTEMPT_TYPE: &str = "set";

/// Message tag of the board broadcast, when present.
pub const UPDATE_TYPE: &str = "update";

/// A card on the board.
///
/// Only `id` has meaning to the sync layer; every other field is an opaque
/// attribute consumed by the set predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique card identifier.
    pub id: String,
    /// Remaining card fields (shape, color, count, ...).
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Card {
    /// Create a card with no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// A row of cards.
pub type Row = Vec<Card>;

/// The full board, row by row.
pub type Board = Vec<Row>;

/// Inbound board broadcast: a full replacement of board and score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// Every row of the board.
    pub cards: Board,
    /// Matches found so far.
    pub score: u64,
}

/// Outbound candidate-match intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAttempt {
    #[serde(rename = "type")]
    kind: String,
    /// The three selected card ids, in selection order.
    #[serde(rename = "selectedIds")]
    pub selected_ids: [String; 3],
}

impl SetAttempt {
    /// Create a set attempt.
    #[must_use]
    pub fn new(selected_ids: [String; 3]) -> Self {
        Self {
            kind: SET_ATTEMPT_TYPE.to_string(),
            selected_ids,
        }
    }
}
