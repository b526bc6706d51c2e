//! Session (match game) board mirror.
//!
//! The coordinator owns the board and score. Every broadcast replaces both
//! wholesale; the client never patches the board itself.

use rally_protocol::{Board, Card, SessionUpdate};
use std::sync::Arc;
use tracing::debug;

/// Read-only mirror of the coordinator's board and score.
#[derive(Debug, Clone, Default)]
pub struct SessionMirror {
    board: Arc<Board>,
    score: u64,
}

impl SessionMirror {
    /// Create a mirror from the snapshot rendered before the channel connects.
    #[must_use]
    pub fn from_snapshot(board: Board, score: u64) -> Self {
        Self {
            board: Arc::new(board),
            score,
        }
    }

    /// Replace board and score with a broadcast (last write wins).
    pub fn apply(&mut self, update: SessionUpdate) {
        debug!(
            rows = update.cards.len(),
            score = update.score,
            "Session: board replaced"
        );
        self.board = Arc::new(update.cards);
        self.score = update.score;
    }

    /// The board.
    #[must_use]
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    /// The score.
    #[must_use]
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Iterate over every card, row by row.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.board.iter().flatten()
    }

    /// Find a card by id.
    #[must_use]
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards().find(|card| card.id == id)
    }
}

impl From<SessionUpdate> for SessionMirror {
    fn from(update: SessionUpdate) -> Self {
        Self::from_snapshot(update.cards, update.score)
    }
}
