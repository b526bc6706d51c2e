//! Presence pipeline.
//!
//! Mirrors every other agent's cursor in the shared room and streams the
//! local cursor upstream on every sample.

use rally_core::{ConnectionState, PointerSample, PresenceMirror, PresenceView};
use rally_protocol::{codec, CursorIntent};
use rally_transport::{RoomAddress, Transport};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use crate::handle::ClientHandle;
use crate::metrics::{self, pipeline};
use crate::pump::{self, Link};

/// Local intents accepted by the presence pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresenceCommand {
    /// A pointer or touch-move sample in client pixels.
    PointerMoved(PointerSample),
    /// A touch gesture ended.
    TouchEnded,
    /// The viewport was resized.
    Resized {
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
    },
}

/// Handle to a running presence pipeline.
pub type PresenceHandle = ClientHandle<PresenceCommand, PresenceView>;

impl PresenceHandle {
    /// Report a pointer or touch-move sample.
    pub fn pointer_moved(&self, sample: PointerSample) -> bool {
        self.command(PresenceCommand::PointerMoved(sample))
    }

    /// Report the end of a touch gesture.
    pub fn touch_ended(&self) -> bool {
        self.command(PresenceCommand::TouchEnded)
    }

    /// Report new viewport dimensions.
    pub fn resized(&self, width: f64, height: f64) -> bool {
        self.command(PresenceCommand::Resized { width, height })
    }
}

/// Presence pipeline launcher.
#[derive(Debug, Clone, Copy)]
pub struct PresenceClient;

impl PresenceClient {
    /// Connect to a presence room and start mirroring it.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(transport: Arc<dyn Transport>, address: RoomAddress) -> PresenceHandle {
        let mirror = PresenceMirror::new();
        let (view_tx, view_rx) = watch::channel(mirror.view());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(transport, address, mirror, command_rx, view_tx));
        ClientHandle::new(command_tx, task, view_rx)
    }
}

async fn run(
    transport: Arc<dyn Transport>,
    address: RoomAddress,
    mut mirror: PresenceMirror,
    mut commands: mpsc::UnboundedReceiver<PresenceCommand>,
    view: watch::Sender<PresenceView>,
) {
    let Some((mut link, queued)) = pump::connect_or_shutdown(
        transport.as_ref(),
        address.clone(),
        pipeline::PRESENCE,
        &mut commands,
    )
    .await
    else {
        return;
    };
    if let Some(id) = link.assigned_id() {
        mirror.assign_id(id);
    }
    mirror.set_connection(link.state());
    publish(&mirror, &view);

    for command in queued {
        handle_command(&mut mirror, &mut link, &view, command).await;
    }

    loop {
        tokio::select! {
            frame = link.recv() => match frame {
                Some(text) => {
                    if handle_frame(&mut mirror, &text) {
                        publish(&mirror, &view);
                    }
                }
                None => {
                    mirror.set_connection(ConnectionState::Closed);
                    publish(&mirror, &view);
                }
            },

            command = commands.recv() => match command {
                Some(command) => handle_command(&mut mirror, &mut link, &view, command).await,
                None => break,
            },
        }
    }

    link.close().await;
    debug!(room = %address, "Presence pipeline stopped");
}

/// Apply an inbound frame. Returns `true` if the mirror changed.
fn handle_frame(mirror: &mut PresenceMirror, text: &str) -> bool {
    match codec::decode_presence(text) {
        Ok(Some(message)) => {
            trace!(kind = message.kind(), "Presence: inbound");
            mirror.apply(message)
        }
        Ok(None) => {
            trace!("Presence: ignoring unknown message type");
            false
        }
        Err(e) => {
            warn!(error = %e, "Presence: dropping malformed frame");
            metrics::record_protocol_error(pipeline::PRESENCE);
            false
        }
    }
}

async fn handle_command(
    mirror: &mut PresenceMirror,
    link: &mut Link,
    view: &watch::Sender<PresenceView>,
    command: PresenceCommand,
) {
    match command {
        PresenceCommand::PointerMoved(sample) => {
            if let Some(intent) = mirror.pointer_moved(sample) {
                publish(mirror, view);
                send_intent(link, &intent).await;
            }
        }
        PresenceCommand::TouchEnded => {
            let intent = mirror.touch_ended();
            publish(mirror, view);
            send_intent(link, &intent).await;
        }
        PresenceCommand::Resized { width, height } => {
            mirror.resize(width, height);
            publish(mirror, view);
        }
    }

    if mirror.connection() != link.state() {
        mirror.set_connection(link.state());
        publish(mirror, view);
    }
}

async fn send_intent(link: &mut Link, intent: &CursorIntent) {
    match codec::encode_cursor(intent) {
        Ok(text) => link.send(text).await,
        Err(e) => {
            warn!(error = %e, "Presence: dropping unencodable cursor");
            metrics::record_protocol_error(pipeline::PRESENCE);
        }
    }
}

fn publish(mirror: &PresenceMirror, view: &watch::Sender<PresenceView>) {
    metrics::set_participants(mirror.participant_count());
    view.send_replace(mirror.view());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::StalledTransport;
    use rally_protocol::PointerKind;
    use rally_transport::{MemoryTransport, RemotePeer};
    use std::time::Duration;

    fn address() -> RoomAddress {
        RoomAddress::new("localhost:1999", "cursors", "shared-cursors").unwrap()
    }

    fn setup() -> (PresenceHandle, RemotePeer) {
        let transport = Arc::new(MemoryTransport::new());
        let peer = transport.open(&address(), "me");
        let handle = PresenceClient::spawn(transport, address());
        (handle, peer)
    }

    #[tokio::test]
    async fn test_connect_assigns_id_and_counts_self() {
        let (handle, _peer) = setup();
        let mut view = handle.view();

        let current = view.wait_for(|v| v.connection.is_open()).await.unwrap().clone();
        assert_eq!(current.my_id.as_deref(), Some("me"));
        assert!(current.my_cursor.is_none());
        assert_eq!(current.participant_count(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_then_remove() {
        let (handle, peer) = setup();
        let mut view = handle.view();

        peer.send(r#"{"type":"update","id":"a","x":0.5,"y":0.5,"lastUpdate":1,"pointer":"mouse"}"#)
            .unwrap();
        let current = view.wait_for(|v| v.others.contains_key("a")).await.unwrap().clone();
        assert_eq!(current.others["a"].x, 0.5);
        assert_eq!(current.others["a"].pointer, PointerKind::Mouse);
        assert_eq!(current.participant_count(), 2);

        peer.send(r#"{"type":"remove","id":"a"}"#).unwrap();
        view.wait_for(|v| v.others.is_empty()).await.unwrap();

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_frames_are_ignored() {
        let (handle, peer) = setup();
        let mut view = handle.view();

        peer.send("{not json").unwrap();
        peer.send(r#"{"type":"wave","id":"a"}"#).unwrap();
        peer.send(r#"{"type":"sync","cursors":{"b":{"x":0.1,"y":0.2,"lastUpdate":3,"pointer":"touch"}}}"#)
            .unwrap();

        let current = view.wait_for(|v| !v.others.is_empty()).await.unwrap().clone();
        assert_eq!(current.others.len(), 1);
        assert!(current.others.contains_key("b"));
        assert!(handle.is_running());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_pointer_samples_are_sent_unthrottled() {
        let (handle, mut peer) = setup();

        // Unmeasured viewport: sample dropped, nothing sent
        handle.pointer_moved(PointerSample::mouse(10.0, 10.0));
        handle.resized(200.0, 100.0);
        handle.pointer_moved(PointerSample::mouse(50.0, 25.0));
        handle.pointer_moved(PointerSample::mouse(100.0, 50.0));

        let first: serde_json::Value =
            serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(
            first,
            serde_json::json!({"x": 0.25, "y": 0.25, "pointer": "mouse"})
        );
        let second: serde_json::Value =
            serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(second["x"], 0.5);

        let mut view = handle.view();
        let current = view.wait_for(|v| v.my_cursor.is_some()).await.unwrap().clone();
        assert_eq!(current.viewport.width, 200.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_touch_end_sends_idle_and_clears_cursor() {
        let (handle, mut peer) = setup();
        handle.resized(100.0, 100.0);
        handle.pointer_moved(PointerSample::touch(10.0, 20.0));
        handle.touch_ended();

        let moved: serde_json::Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(moved["pointer"], "touch");
        assert_eq!(peer.recv().await.as_deref(), Some("{}"));

        let mut view = handle.view();
        view.wait_for(|v| v.my_cursor.is_none() && v.viewport.width == 100.0)
            .await
            .unwrap();

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_remote_disconnect_clears_others() {
        let (handle, mut peer) = setup();
        let mut view = handle.view();

        peer.send(r#"{"type":"update","id":"a","x":0.1,"y":0.1,"lastUpdate":1,"pointer":"mouse"}"#)
            .unwrap();
        view.wait_for(|v| v.others.len() == 1).await.unwrap();

        peer.disconnect();
        let current = view
            .wait_for(|v| v.connection == ConnectionState::Closed)
            .await
            .unwrap()
            .clone();
        assert!(current.others.is_empty());
        assert_eq!(current.participant_count(), 0);

        // Local intents keep working; sends are dropped
        assert!(handle.touch_ended());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_room_reports_closed() {
        let transport = Arc::new(MemoryTransport::new());
        let handle = PresenceClient::spawn(transport, address());
        let mut view = handle.view();

        view.wait_for(|v| v.connection == ConnectionState::Closed)
            .await
            .unwrap();
        assert!(handle.current().my_id.is_none());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejected_send_reports_closed() {
        let (handle, mut peer) = setup();
        handle.resized(100.0, 100.0);
        handle.pointer_moved(PointerSample::mouse(10.0, 10.0));
        assert!(peer.recv().await.is_some());

        peer.stop_reading();
        handle.pointer_moved(PointerSample::mouse(20.0, 20.0));

        let mut view = handle.view();
        let current = view
            .wait_for(|v| v.connection == ConnectionState::Closed)
            .await
            .unwrap()
            .clone();
        assert!(current.others.is_empty());
        assert!(handle.is_running());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_intents_before_connect_are_replayed() {
        let transport = Arc::new(MemoryTransport::new());
        let mut peer = transport.open(&address(), "me");
        let handle = PresenceClient::spawn(transport, address());
        handle.resized(100.0, 100.0);
        handle.pointer_moved(PointerSample::mouse(50.0, 50.0));

        let sent: serde_json::Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(sent["x"], 0.5);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_connecting_returns() {
        let handle = PresenceClient::spawn(Arc::new(StalledTransport), address());
        handle.resized(100.0, 100.0);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.current().connection, ConnectionState::Connecting);
        assert!(
            tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let (handle, mut peer) = setup();
        let mut view = handle.view();
        view.wait_for(|v| v.connection.is_open()).await.unwrap();

        handle.shutdown().await;
        assert_eq!(peer.recv().await, None);
    }
}
