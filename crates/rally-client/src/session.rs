//! Match game session pipeline.
//!
//! Mirrors the coordinator's board and score, runs the local selection
//! engine and sends every completed selection upstream as a set attempt.
//! Win and lose flashes expire on a timer owned by the pipeline loop, so
//! shutting the pipeline down also cancels any pending expiry.

use rally_core::{ConnectionState, MatchGame, SessionMirror, SessionView, SetRule};
use rally_protocol::{codec, SessionUpdate};
use rally_transport::{RoomAddress, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::handle::ClientHandle;
use crate::metrics::{self, pipeline};
use crate::pump::{self, Link};

/// Local intents accepted by the session pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Toggle a card in the selection.
    Select(String),
}

/// Handle to a running session pipeline.
pub type SessionHandle = ClientHandle<SessionCommand, SessionView>;

impl SessionHandle {
    /// Toggle a card in the local selection.
    pub fn select(&self, card_id: impl Into<String>) -> bool {
        self.command(SessionCommand::Select(card_id.into()))
    }
}

/// Session pipeline launcher.
#[derive(Debug, Clone, Copy)]
pub struct SessionClient;

impl SessionClient {
    /// Connect to a game room, starting from the board rendered at mount.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(
        transport: Arc<dyn Transport>,
        address: RoomAddress,
        initial: SessionUpdate,
        rule: Arc<dyn SetRule>,
        flash_duration: Duration,
    ) -> SessionHandle {
        let game = MatchGame::with_rule(SessionMirror::from(initial), rule, flash_duration);
        let (view_tx, view_rx) = watch::channel(game.view());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(transport, address, game, command_rx, view_tx));
        ClientHandle::new(command_tx, task, view_rx)
    }
}

async fn run(
    transport: Arc<dyn Transport>,
    address: RoomAddress,
    mut game: MatchGame,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    view: watch::Sender<SessionView>,
) {
    let Some((mut link, queued)) = pump::connect_or_shutdown(
        transport.as_ref(),
        address.clone(),
        pipeline::SESSION,
        &mut commands,
    )
    .await
    else {
        return;
    };
    game.set_connection(link.state());
    view.send_replace(game.view());

    for SessionCommand::Select(card_id) in queued {
        select(&mut game, &mut link, &card_id).await;
        game.set_connection(link.state());
        view.send_replace(game.view());
    }

    loop {
        tokio::select! {
            frame = link.recv() => match frame {
                Some(text) => {
                    if handle_frame(&mut game, &text) {
                        view.send_replace(game.view());
                    }
                }
                None => {
                    game.set_connection(ConnectionState::Closed);
                    view.send_replace(game.view());
                }
            },

            command = commands.recv() => match command {
                Some(SessionCommand::Select(card_id)) => {
                    select(&mut game, &mut link, &card_id).await;
                    game.set_connection(link.state());
                    view.send_replace(game.view());
                }
                None => break,
            },

            () = pump::sleep_until(game.next_effect_deadline()) => {
                if game.expire_effects(Instant::now()) {
                    trace!("Session: flash expired");
                    view.send_replace(game.view());
                }
            }
        }
    }

    link.close().await;
    debug!(room = %address, "Session pipeline stopped");
}

/// Apply an inbound frame. Returns `true` if the board was replaced.
fn handle_frame(game: &mut MatchGame, text: &str) -> bool {
    match codec::decode_session(text) {
        Ok(Some(update)) => {
            debug!(score = update.score, rows = update.cards.len(), "Session: board update");
            game.apply_update(update);
            true
        }
        Ok(None) => {
            trace!("Session: ignoring unknown message type");
            false
        }
        Err(e) => {
            warn!(error = %e, "Session: dropping malformed frame");
            metrics::record_protocol_error(pipeline::SESSION);
            false
        }
    }
}

async fn select(game: &mut MatchGame, link: &mut Link, card_id: &str) {
    let evaluation = match game.select(card_id, Instant::now()) {
        Ok(Some(evaluation)) => evaluation,
        Ok(None) => return,
        Err(e) => {
            error!(card = %card_id, error = %e, "Session: stale selection, evaluation aborted");
            metrics::record_stale_selection();
            return;
        }
    };

    metrics::record_set_attempt(evaluation.is_set);
    match codec::encode_set_attempt(&evaluation.attempt) {
        Ok(text) => link.send(text).await,
        Err(e) => {
            warn!(error = %e, "Session: dropping unencodable set attempt");
            metrics::record_protocol_error(pipeline::SESSION);
        }
    }
}
