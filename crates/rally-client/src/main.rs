//! # rally
//!
//! Joins the shared presence room, the room directory and optionally a
//! match game, then logs every view change until Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! rally
//!
//! # Join a game room on a remote coordinator
//! RALLY_HOST=rally.example.dev RALLY_GAME_ROOM=room-42 rally
//! ```

use anyhow::Result;
use rally_client::{metrics, Config, PresenceClient, RoomListClient, SessionClient};
use rally_core::{AttributeSetRule, PresenceView, RoomsView, SessionView};
use rally_protocol::SessionUpdate;
use rally_transport::{Transport, WebSocketTransport};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rally=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;

    info!("Starting rally against {}", config.host);

    // Initialize metrics
    metrics::init_metrics();
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::new(config.websocket()));

    let presence = if config.presence.enabled {
        let handle = PresenceClient::spawn(Arc::clone(&transport), config.presence_address()?);
        tokio::spawn(log_presence(handle.view()));
        Some(handle)
    } else {
        None
    };

    let rooms = if config.rooms.enabled {
        let handle = RoomListClient::spawn(Arc::clone(&transport), config.rooms_address()?, Vec::new());
        tokio::spawn(log_rooms(handle.view()));
        Some(handle)
    } else {
        None
    };

    let session = match config.session_address()? {
        Some(address) => {
            let handle = SessionClient::spawn(
                Arc::clone(&transport),
                address,
                SessionUpdate::default(),
                Arc::new(AttributeSetRule),
                config.flash_duration(),
            );
            tokio::spawn(log_session(handle.view()));
            Some(handle)
        }
        None => None,
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    if let Some(handle) = presence {
        handle.shutdown().await;
    }
    if let Some(handle) = rooms {
        handle.shutdown().await;
    }
    if let Some(handle) = session {
        handle.shutdown().await;
    }

    Ok(())
}

async fn log_presence(mut view: watch::Receiver<PresenceView>) {
    while view.changed().await.is_ok() {
        let current = view.borrow_and_update().clone();
        info!(
            connection = %current.connection,
            participants = current.participant_count(),
            me = current.my_id.as_deref().unwrap_or("-"),
            "Presence"
        );
    }
}

async fn log_rooms(mut view: watch::Receiver<RoomsView>) {
    while view.changed().await.is_ok() {
        let current = view.borrow_and_update().clone();
        for room in current.rooms.iter() {
            info!(room = %room.id, connections = room.connections, "Room");
        }
        info!(
            connection = %current.connection,
            rooms = current.rooms.len(),
            connections = current.total_connections(),
            "Rooms"
        );
    }
}

async fn log_session(mut view: watch::Receiver<SessionView>) {
    while view.changed().await.is_ok() {
        let current = view.borrow_and_update().clone();
        info!(
            connection = %current.connection,
            score = current.score,
            cards = current.board.iter().map(Vec::len).sum::<usize>(),
            "Session"
        );
    }
}
