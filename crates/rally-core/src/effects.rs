//! Timed visual effect flags.
//!
//! After each evaluation the selected cards pulse as a win or a loss for a
//! short time. A new evaluation replaces both sets and restarts the timer, so
//! a pending expiry from an earlier cycle can never clear the newer flash.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Default flash duration.
pub const DEFAULT_FLASH_DURATION: Duration = Duration::from_millis(300);

/// Which flash set an evaluation lights up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashKind {
    /// The cards formed a set locally.
    Win,
    /// The cards did not form a set locally.
    Lose,
}

/// The win and lose flash sets with a shared expiry.
#[derive(Debug, Clone)]
pub struct EffectFlags {
    win: Vec<String>,
    lose: Vec<String>,
    deadline: Option<Instant>,
    duration: Duration,
}

impl Default for EffectFlags {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH_DURATION)
    }
}

impl EffectFlags {
    /// Create empty flags with the given flash duration.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            win: Vec::new(),
            lose: Vec::new(),
            deadline: None,
            duration,
        }
    }

    /// Light up `ids` as `kind`, replacing both sets.
    pub fn flash(&mut self, kind: FlashKind, ids: Vec<String>, now: Instant) {
        trace!(?kind, cards = ids.len(), "Effects: flash");
        match kind {
            FlashKind::Win => {
                self.win = ids;
                self.lose.clear();
            }
            FlashKind::Lose => {
                self.lose = ids;
                self.win.clear();
            }
        }
        self.deadline = Some(now + self.duration);
    }

    /// Clear both sets if the deadline has passed.
    ///
    /// Returns `true` if anything was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.win.clear();
                self.lose.clear();
                true
            }
            _ => false,
        }
    }

    /// When the current flash expires, if one is active.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cards flashing as a win.
    #[must_use]
    pub fn win(&self) -> &[String] {
        &self.win
    }

    /// Cards flashing as a loss.
    #[must_use]
    pub fn lose(&self) -> &[String] {
        &self.lose
    }
}
