//! Match game state machine.
//!
//! Combines the board mirror, the local selection, the set rule and the
//! effect flags. The coordinator is the only party allowed to change the
//! board or score; local evaluation exists to give immediate feedback ahead
//! of the round trip.

use rally_protocol::{Board, SessionUpdate, SetAttempt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::effects::{EffectFlags, FlashKind, DEFAULT_FLASH_DURATION};
use crate::rules::{AttributeSetRule, SetRule};
use crate::selection::{resolve, Selection, SelectionError};
use crate::session::SessionMirror;
use crate::view::{ConnectionState, SessionView};

/// Result of evaluating a complete selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Candidate-match intent to send upstream, regardless of `is_set`.
    pub attempt: SetAttempt,
    /// Local verdict of the set rule.
    pub is_set: bool,
}

/// Local state of one match game session.
pub struct MatchGame {
    session: SessionMirror,
    selection: Selection,
    effects: EffectFlags,
    rule: Arc<dyn SetRule>,
    connection: ConnectionState,
}

impl std::fmt::Debug for MatchGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchGame")
            .field("session", &self.session)
            .field("selection", &self.selection)
            .field("effects", &self.effects)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl MatchGame {
    /// Create a game from the snapshot rendered before the channel connects.
    #[must_use]
    pub fn new(initial: SessionMirror) -> Self {
        Self::with_rule(initial, Arc::new(AttributeSetRule), DEFAULT_FLASH_DURATION)
    }

    /// Create a game with a custom set rule and flash duration.
    #[must_use]
    pub fn with_rule(
        initial: SessionMirror,
        rule: Arc<dyn SetRule>,
        flash_duration: Duration,
    ) -> Self {
        Self {
            session: initial,
            selection: Selection::new(),
            effects: EffectFlags::new(flash_duration),
            rule,
            connection: ConnectionState::Connecting,
        }
    }

    /// Apply a board broadcast.
    ///
    /// The selection is kept as is; ids that disappeared are detected when
    /// the selection completes.
    pub fn apply_update(&mut self, update: SessionUpdate) {
        self.session.apply(update);
    }

    /// Toggle a card in the local selection.
    ///
    /// When the selection reaches a full set it is resolved against the
    /// current board, evaluated, flashed and cleared. The returned
    /// [`Evaluation`] carries the attempt that must be sent upstream.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::StaleReference`] if a selected card is no
    /// longer on the board. The selection is cleared, nothing is flashed and
    /// nothing should be sent.
    pub fn select(
        &mut self,
        card_id: impl Into<String>,
        now: Instant,
    ) -> Result<Option<Evaluation>, SelectionError> {
        self.selection.toggle(card_id);
        let Some(ids) = self.selection.take_set() else {
            return Ok(None);
        };

        let is_set = match resolve(&self.session, &ids) {
            Ok(cards) => self.rule.is_set(&cards),
            Err(e) => {
                debug!(error = %e, "Session: evaluation aborted");
                return Err(e);
            }
        };

        let kind = if is_set { FlashKind::Win } else { FlashKind::Lose };
        self.effects.flash(kind, ids.to_vec(), now);
        debug!(?ids, is_set, "Session: selection evaluated");

        Ok(Some(Evaluation {
            attempt: SetAttempt::new(ids),
            is_set,
        }))
    }

    /// Clear expired effect flags.
    ///
    /// Returns `true` if anything was cleared.
    pub fn expire_effects(&mut self, now: Instant) -> bool {
        self.effects.expire(now)
    }

    /// When the active flash expires, if any.
    #[must_use]
    pub fn next_effect_deadline(&self) -> Option<Instant> {
        self.effects.next_deadline()
    }

    /// Update the channel status.
    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    /// Current board.
    #[must_use]
    pub fn board(&self) -> &Board {
        self.session.board()
    }

    /// Local selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Effect flags.
    #[must_use]
    pub fn effects(&self) -> &EffectFlags {
        &self.effects
    }

    /// Snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            board: Arc::clone(self.session.board()),
            score: self.session.score(),
            selection: self.selection.ids().to_vec(),
            win_flash: self.effects.win().to_vec(),
            lose_flash: self.effects.lose().to_vec(),
            connection: self.connection,
        }
    }
}
