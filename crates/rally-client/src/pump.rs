//! Channel plumbing shared by the pipelines.

use rally_core::ConnectionState;
use rally_transport::{Channel, ChannelState, RoomAddress, Transport, TransportError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics;

/// A pipeline's channel, absent once closed or never opened.
pub(crate) struct Link {
    pipeline: &'static str,
    address: RoomAddress,
    channel: Option<Box<dyn Channel>>,
}

impl Link {
    /// Open the channel. Failure leaves the link closed.
    pub(crate) async fn connect(
        transport: &dyn Transport,
        address: RoomAddress,
        pipeline: &'static str,
    ) -> Self {
        let channel = match transport.connect(&address).await {
            Ok(channel) => {
                debug!(
                    room = %address,
                    connection = %channel.assigned_id(),
                    transport = transport.name(),
                    "Channel open"
                );
                metrics::record_channel_open(pipeline);
                Some(channel)
            }
            Err(e) => {
                warn!(room = %address, error = %e, "Failed to connect");
                metrics::record_transport_error(pipeline, "connect");
                None
            }
        };

        Self {
            pipeline,
            address,
            channel,
        }
    }

    /// Id assigned to the local agent, while open.
    pub(crate) fn assigned_id(&self) -> Option<String> {
        self.channel
            .as_ref()
            .map(|channel| channel.assigned_id().as_str().to_string())
    }

    /// Connection state as shown to rendering.
    pub(crate) fn state(&self) -> ConnectionState {
        self.channel
            .as_ref()
            .map_or(ConnectionState::Closed, |channel| rendered(channel.state()))
    }

    /// Wait for the next inbound frame.
    ///
    /// Pending forever while closed. Returns `None` when the channel closes,
    /// after which the link stays closed.
    pub(crate) async fn recv(&mut self) -> Option<String> {
        let Some(channel) = self.channel.as_mut() else {
            return std::future::pending().await;
        };

        match channel.recv().await {
            Ok(Some(text)) => {
                metrics::record_frame(self.pipeline, "inbound", text.len());
                Some(text)
            }
            Ok(None) => {
                debug!(room = %self.address, "Channel closed by remote");
                self.drop_channel();
                None
            }
            Err(e) => {
                warn!(room = %self.address, error = %e, "Channel receive failed");
                metrics::record_transport_error(self.pipeline, "receive");
                self.drop_channel();
                None
            }
        }
    }

    /// Send a frame, dropping it with a warning if the channel is gone.
    ///
    /// A failed send closes the link; callers re-read [`Link::state`].
    pub(crate) async fn send(&mut self, text: String) {
        let Some(channel) = self.channel.as_mut() else {
            warn!(room = %self.address, "Dropping outbound frame, channel closed");
            return;
        };

        let bytes = text.len();
        match channel.send(text).await {
            Ok(()) => {
                metrics::record_frame(self.pipeline, "outbound", bytes);
                return;
            }
            Err(TransportError::ConnectionClosed) => {
                warn!(room = %self.address, "Dropping outbound frame, channel closed");
            }
            Err(e) => {
                warn!(room = %self.address, error = %e, "Channel send failed");
            }
        }
        metrics::record_transport_error(self.pipeline, "send");
        self.drop_channel();
    }

    /// Close the channel gracefully.
    pub(crate) async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!(room = %self.address, error = %e, "Channel close failed");
            }
            metrics::record_channel_closed(self.pipeline);
            debug!(room = %self.address, "Channel closed");
        }
    }

    fn drop_channel(&mut self) {
        if self.channel.take().is_some() {
            metrics::record_channel_closed(self.pipeline);
        }
    }
}

/// Connect while still accepting intents.
///
/// Intents queued before the channel settles are returned for replay.
/// Returns `None` if the handle shut down first, abandoning the connect.
pub(crate) async fn connect_or_shutdown<C>(
    transport: &dyn Transport,
    address: RoomAddress,
    pipeline: &'static str,
    commands: &mut mpsc::UnboundedReceiver<C>,
) -> Option<(Link, Vec<C>)> {
    let room = address.to_string();
    let connect = Link::connect(transport, address, pipeline);
    tokio::pin!(connect);

    let mut queued = Vec::new();
    loop {
        tokio::select! {
            link = &mut connect => return Some((link, queued)),
            command = commands.recv() => match command {
                Some(command) => queued.push(command),
                None => {
                    debug!(room = %room, "Shut down while connecting");
                    return None;
                }
            },
        }
    }
}

fn rendered(state: ChannelState) -> ConnectionState {
    match state {
        ChannelState::Connecting => ConnectionState::Connecting,
        ChannelState::Open => ConnectionState::Open,
        ChannelState::Closed => ConnectionState::Closed,
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub(crate) async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Transport whose connect never settles.
#[cfg(test)]
pub(crate) struct StalledTransport;

#[cfg(test)]
#[async_trait::async_trait]
impl Transport for StalledTransport {
    async fn connect(&self, _address: &RoomAddress) -> Result<Box<dyn Channel>, TransportError> {
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}
