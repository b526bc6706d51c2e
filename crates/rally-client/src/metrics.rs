//! Metrics collection and export for rally.
//!
//! Uses the `metrics` crate for instrumentation. Without an installed
//! recorder every call is a no-op; the `rally` binary installs the
//! Prometheus exporter when enabled.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const FRAMES_TOTAL: &str = "rally_frames_total";
    pub const FRAMES_BYTES: &str = "rally_frames_bytes";
    pub const CHANNELS_OPEN: &str = "rally_channels_open";
    pub const PROTOCOL_ERRORS_TOTAL: &str = "rally_protocol_errors_total";
    pub const TRANSPORT_ERRORS_TOTAL: &str = "rally_transport_errors_total";
    pub const STALE_SELECTIONS_TOTAL: &str = "rally_stale_selections_total";
    pub const SET_ATTEMPTS_TOTAL: &str = "rally_set_attempts_total";
    pub const PARTICIPANTS: &str = "rally_participants";
}

/// Pipeline labels.
pub mod pipeline {
    pub const PRESENCE: &str = "presence";
    pub const SESSION: &str = "session";
    pub const ROOMS: &str = "rooms";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(names::FRAMES_TOTAL, "Total number of frames per pipeline");
    metrics::describe_counter!(names::FRAMES_BYTES, "Total bytes of frames per pipeline");
    metrics::describe_gauge!(names::CHANNELS_OPEN, "Current number of open room channels");
    metrics::describe_counter!(
        names::PROTOCOL_ERRORS_TOTAL,
        "Inbound frames dropped because they could not be decoded"
    );
    metrics::describe_counter!(
        names::TRANSPORT_ERRORS_TOTAL,
        "Connect, send and receive failures"
    );
    metrics::describe_counter!(
        names::STALE_SELECTIONS_TOTAL,
        "Evaluations aborted because a selected card left the board"
    );
    metrics::describe_counter!(
        names::SET_ATTEMPTS_TOTAL,
        "Set attempts sent, by local verdict"
    );
    metrics::describe_gauge!(names::PARTICIPANTS, "Agents in the presence room");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a frame.
pub fn record_frame(pipeline: &'static str, direction: &'static str, bytes: usize) {
    counter!(names::FRAMES_TOTAL, "pipeline" => pipeline, "direction" => direction).increment(1);
    counter!(names::FRAMES_BYTES, "pipeline" => pipeline, "direction" => direction)
        .increment(bytes as u64);
}

/// Record an opened channel.
pub fn record_channel_open(pipeline: &'static str) {
    gauge!(names::CHANNELS_OPEN, "pipeline" => pipeline).increment(1.0);
}

/// Record a closed channel.
pub fn record_channel_closed(pipeline: &'static str) {
    gauge!(names::CHANNELS_OPEN, "pipeline" => pipeline).decrement(1.0);
}

/// Record a frame that failed to decode or encode.
pub fn record_protocol_error(pipeline: &'static str) {
    counter!(names::PROTOCOL_ERRORS_TOTAL, "pipeline" => pipeline).increment(1);
}

/// Record a transport failure.
pub fn record_transport_error(pipeline: &'static str, stage: &'static str) {
    counter!(names::TRANSPORT_ERRORS_TOTAL, "pipeline" => pipeline, "stage" => stage)
        .increment(1);
}

/// Record an aborted evaluation.
pub fn record_stale_selection() {
    counter!(names::STALE_SELECTIONS_TOTAL).increment(1);
}

/// Record a set attempt sent upstream.
pub fn record_set_attempt(is_set: bool) {
    let verdict = if is_set { "win" } else { "lose" };
    counter!(names::SET_ATTEMPTS_TOTAL, "verdict" => verdict).increment(1);
}

/// Update the presence participant count.
pub fn set_participants(count: usize) {
    gauge!(names::PARTICIPANTS).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed; calls must be no-ops
        record_frame(pipeline::PRESENCE, "inbound", 42);
        record_protocol_error(pipeline::SESSION);
        record_set_attempt(true);
        set_participants(3);
    }
}
