//! Room directory pipeline.
//!
//! Read-only: the directory broadcasts the complete room list and the
//! pipeline swaps it in. Nothing is ever sent upstream.

use rally_core::{ConnectionState, RoomDirectory, RoomsView};
use rally_protocol::{codec, RoomInfo};
use rally_transport::{RoomAddress, Transport};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::handle::ClientHandle;
use crate::metrics::{self, pipeline};
use crate::pump;

/// Handle to a running room directory pipeline.
pub type RoomListHandle = ClientHandle<Infallible, RoomsView>;

/// Room directory pipeline launcher.
#[derive(Debug, Clone, Copy)]
pub struct RoomListClient;

impl RoomListClient {
    /// Connect to the directory, starting from the list rendered at mount.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(
        transport: Arc<dyn Transport>,
        address: RoomAddress,
        initial: Vec<RoomInfo>,
    ) -> RoomListHandle {
        let directory = RoomDirectory::from_snapshot(initial);
        let (view_tx, view_rx) = watch::channel(directory.view());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(transport, address, directory, command_rx, view_tx));
        ClientHandle::new(command_tx, task, view_rx)
    }
}

async fn run(
    transport: Arc<dyn Transport>,
    address: RoomAddress,
    mut directory: RoomDirectory,
    mut commands: mpsc::UnboundedReceiver<Infallible>,
    view: watch::Sender<RoomsView>,
) {
    let Some((mut link, _)) = pump::connect_or_shutdown(
        transport.as_ref(),
        address.clone(),
        pipeline::ROOMS,
        &mut commands,
    )
    .await
    else {
        return;
    };
    directory.set_connection(link.state());
    view.send_replace(directory.view());

    loop {
        tokio::select! {
            frame = link.recv() => match frame {
                Some(text) => match codec::decode_room_list(&text) {
                    Ok(rooms) => {
                        directory.apply(rooms);
                        view.send_replace(directory.view());
                    }
                    Err(e) => {
                        warn!(error = %e, "Rooms: dropping malformed frame");
                        metrics::record_protocol_error(pipeline::ROOMS);
                    }
                },
                None => {
                    directory.set_connection(ConnectionState::Closed);
                    view.send_replace(directory.view());
                }
            },

            // Only ever resolves once the handle is gone
            None = commands.recv() => break,
        }
    }

    link.close().await;
    debug!(room = %address, "Room directory pipeline stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::StalledTransport;
    use rally_transport::MemoryTransport;
    use std::time::Duration;

    fn address() -> RoomAddress {
        RoomAddress::new("localhost:1999", "chatrooms", "index").unwrap()
    }

    #[tokio::test]
    async fn test_room_list_is_replaced() {
        let transport = Arc::new(MemoryTransport::new());
        let peer = transport.open(&address(), "me");
        let handle = RoomListClient::spawn(transport, address(), vec![RoomInfo::new("lobby")]);
        assert_eq!(handle.current().rooms[0].id, "lobby");

        let mut view = handle.view();
        peer.send("not a list").unwrap();
        peer.send(r#"[{"id":"a","connections":2,"users":[{"id":"u1","present":true}]},{"id":"b"}]"#)
            .unwrap();

        let current = view.wait_for(|v| v.rooms.len() == 2).await.unwrap().clone();
        assert_eq!(current.rooms[0].connections, 2);
        assert_eq!(current.rooms[1].connections, 0);
        assert!(current.connection.is_open());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_closed_directory_keeps_last_list() {
        let transport = Arc::new(MemoryTransport::new());
        let mut peer = transport.open(&address(), "me");
        let handle = RoomListClient::spawn(transport, address(), vec![RoomInfo::new("lobby")]);
        let mut view = handle.view();

        peer.disconnect();
        let current = view
            .wait_for(|v| v.connection == ConnectionState::Closed)
            .await
            .unwrap()
            .clone();
        assert_eq!(current.rooms.len(), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_connecting_returns() {
        let handle = RoomListClient::spawn(
            Arc::new(StalledTransport),
            address(),
            vec![RoomInfo::new("lobby")],
        );
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.current().connection, ConnectionState::Connecting);
        assert!(
            tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
                .await
                .is_ok()
        );
    }
}
