//! Local card selection.
//!
//! Selection is owned by the local client only. Ids accumulate one at a
//! time; picking an already selected id deselects it.

use rally_protocol::Card;
use thiserror::Error;

use crate::session::SessionMirror;

/// Number of cards in a set.
pub const SET_SIZE: usize = 3;

/// Selection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// A selected card is no longer on the board.
    ///
    /// Happens when a board broadcast replaced the card while it was
    /// selected.
    #[error("Selected card {id} is no longer on the board")]
    StaleReference {
        /// The missing card id.
        id: String,
    },
}

/// An ordered set of up to [`SET_SIZE`] distinct card ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a card id.
    ///
    /// Returns `true` once the selection holds exactly [`SET_SIZE`] ids.
    /// Ids toggled onto a complete selection are ignored.
    pub fn toggle(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else if self.ids.len() < SET_SIZE {
            self.ids.push(id);
        }
        self.is_complete()
    }

    /// Whether the selection holds a full set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.ids.len() == SET_SIZE
    }

    /// Whether a card is selected.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    /// Selected ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of selected ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Take a complete selection, leaving it empty.
    ///
    /// Returns `None` and leaves the selection untouched while it is not
    /// complete.
    pub fn take_set(&mut self) -> Option<[String; SET_SIZE]> {
        if !self.is_complete() {
            return None;
        }
        std::mem::take(&mut self.ids).try_into().ok()
    }
}

/// Resolve selected ids against the current board.
///
/// # Errors
///
/// Returns [`SelectionError::StaleReference`] for the first id that is not on
/// the board.
pub fn resolve<'a>(
    session: &'a SessionMirror,
    ids: &[String],
) -> Result<Vec<&'a Card>, SelectionError> {
    ids.iter()
        .map(|id| {
            session
                .card(id)
                .ok_or_else(|| SelectionError::StaleReference { id: id.clone() })
        })
        .collect()
}
