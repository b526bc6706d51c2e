//! Presence reconciliation.
//!
//! The mirror tracks every other agent's cursor from the coordinator's
//! `sync`/`update`/`remove` stream, plus the local agent's own unsynced
//! cursor. Local pointer samples are normalized against the current
//! viewport and turned into outbound intents.

use rally_protocol::{CursorIntent, CursorRecord, CursorsMap, PointerKind, PresenceMessage};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::view::{ConnectionState, PresenceView};

/// Local viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Viewport {
    /// Create a viewport.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are known and non-zero.
    #[must_use]
    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Convert a pixel position to viewport fractions, clamped to `[0, 1]`.
    ///
    /// Returns `None` until the viewport has been measured.
    #[must_use]
    pub fn normalize(&self, client_x: f64, client_y: f64) -> Option<(f64, f64)> {
        if !self.is_measured() || !client_x.is_finite() || !client_y.is_finite() {
            return None;
        }
        Some((
            (client_x / self.width).clamp(0.0, 1.0),
            (client_y / self.height).clamp(0.0, 1.0),
        ))
    }
}

/// A raw pointer or touch-move sample in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Horizontal pixel position.
    pub client_x: f64,
    /// Vertical pixel position.
    pub client_y: f64,
    /// Device that produced the sample.
    pub pointer: PointerKind,
}

impl PointerSample {
    /// A mouse sample.
    #[must_use]
    pub fn mouse(client_x: f64, client_y: f64) -> Self {
        Self {
            client_x,
            client_y,
            pointer: PointerKind::Mouse,
        }
    }

    /// A touch sample (first touch point).
    #[must_use]
    pub fn touch(client_x: f64, client_y: f64) -> Self {
        Self {
            client_x,
            client_y,
            pointer: PointerKind::Touch,
        }
    }
}

/// The local agent's cursor, normalized to the local viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalCursor {
    /// Horizontal position in `[0, 1]`.
    pub x: f64,
    /// Vertical position in `[0, 1]`.
    pub y: f64,
    /// Device kind.
    pub pointer: PointerKind,
}

impl LocalCursor {
    /// The intent that announces this cursor upstream.
    #[must_use]
    pub fn intent(&self) -> CursorIntent {
        CursorIntent::Move {
            x: self.x,
            y: self.y,
            pointer: self.pointer,
        }
    }
}

/// Client-side mirror of a presence room.
#[derive(Debug, Default)]
pub struct PresenceMirror {
    /// Other agents, shared copy-on-write with published views.
    others: Arc<CursorsMap>,
    /// The local cursor, if a sample has been taken since the last idle.
    my_cursor: Option<LocalCursor>,
    /// Id assigned by the transport.
    my_id: Option<String>,
    /// Latest local viewport.
    viewport: Viewport,
    /// Channel status.
    connection: ConnectionState,
}

impl PresenceMirror {
    /// Create an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the id the transport assigned to the local agent.
    ///
    /// Any entry for that id already present in `others` is dropped.
    pub fn assign_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.others.contains_key(&id) {
            Arc::make_mut(&mut self.others).remove(&id);
        }
        debug!(agent = %id, "Presence: local id assigned");
        self.my_id = Some(id);
    }

    /// Update the channel status.
    ///
    /// Closing the channel forgets every other agent.
    pub fn set_connection(&mut self, state: ConnectionState) {
        if state == ConnectionState::Closed && !self.others.is_empty() {
            debug!(agents = self.others.len(), "Presence: clearing others on disconnect");
            self.others = Arc::new(CursorsMap::new());
        }
        self.connection = state;
    }

    /// Apply an inbound message.
    ///
    /// Returns `true` if `others` changed.
    pub fn apply(&mut self, message: PresenceMessage) -> bool {
        match message {
            PresenceMessage::Sync { mut cursors } => {
                if let Some(my_id) = &self.my_id {
                    cursors.remove(my_id);
                }
                debug!(agents = cursors.len(), "Presence: sync");
                let changed = *self.others != cursors;
                self.others = Arc::new(cursors);
                changed
            }
            PresenceMessage::Update {
                id,
                x,
                y,
                country,
                last_update,
                pointer,
            } => {
                if self.is_me(&id) {
                    trace!(agent = %id, "Presence: ignoring update for local agent");
                    return false;
                }
                let record = CursorRecord {
                    x,
                    y,
                    country,
                    last_update,
                    pointer,
                };
                if self.others.get(&id) == Some(&record) {
                    return false;
                }
                if !self.others.contains_key(&id) {
                    debug!(agent = %id, "Presence: agent joined");
                }
                Arc::make_mut(&mut self.others).insert(id, record);
                true
            }
            PresenceMessage::Remove { id } => {
                if !self.others.contains_key(&id) {
                    return false;
                }
                Arc::make_mut(&mut self.others).remove(&id);
                debug!(agent = %id, "Presence: agent left");
                true
            }
            PresenceMessage::Unknown => false,
        }
    }

    /// Record new viewport dimensions.
    ///
    /// Only future local samples are affected; remote cursors are already
    /// fractions of their sender's viewport.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = Viewport::new(width, height);
    }

    /// Handle a local pointer or touch-move sample.
    ///
    /// Returns the intent to send upstream, or `None` while the viewport is
    /// still unmeasured. Every sample produces an intent; there is no
    /// throttling.
    pub fn pointer_moved(&mut self, sample: PointerSample) -> Option<CursorIntent> {
        let Some((x, y)) = self.viewport.normalize(sample.client_x, sample.client_y) else {
            trace!("Presence: dropping pointer sample, viewport unmeasured");
            return None;
        };
        let cursor = LocalCursor {
            x,
            y,
            pointer: sample.pointer,
        };
        self.my_cursor = Some(cursor);
        Some(cursor.intent())
    }

    /// Handle the end of a touch gesture.
    ///
    /// Clears the local cursor and returns the idle signal to send upstream.
    pub fn touch_ended(&mut self) -> CursorIntent {
        self.my_cursor = None;
        CursorIntent::Idle {}
    }

    /// Other agents' cursors.
    #[must_use]
    pub fn others(&self) -> &CursorsMap {
        &self.others
    }

    /// The local cursor.
    #[must_use]
    pub fn my_cursor(&self) -> Option<LocalCursor> {
        self.my_cursor
    }

    /// The local agent id.
    #[must_use]
    pub fn my_id(&self) -> Option<&str> {
        self.my_id.as_deref()
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Channel status.
    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Number of agents in the room, including the local one while connected.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.others.len() + usize::from(self.connection.is_open())
    }

    /// Snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> PresenceView {
        PresenceView {
            others: Arc::clone(&self.others),
            my_cursor: self.my_cursor,
            my_id: self.my_id.clone(),
            viewport: self.viewport,
            connection: self.connection,
        }
    }

    fn is_me(&self, id: &str) -> bool {
        self.my_id.as_deref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: f64, y: f64) -> CursorRecord {
        CursorRecord {
            x,
            y,
            country: None,
            last_update: 0,
            pointer: PointerKind::Mouse,
        }
    }

    fn update(id: &str, x: f64, y: f64) -> PresenceMessage {
        PresenceMessage::update(id, record(x, y))
    }

    #[test]
    fn test_update_then_remove() {
        let mut mirror = PresenceMirror::new();

        assert!(mirror.apply(update("a", 0.5, 0.5)));
        assert_eq!(mirror.others().len(), 1);
        assert_eq!(mirror.others()["a"], record(0.5, 0.5));

        assert!(mirror.apply(PresenceMessage::remove("a")));
        assert!(mirror.others().is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut mirror = PresenceMirror::new();
        mirror.apply(update("a", 0.1, 0.1));

        assert!(!mirror.apply(PresenceMessage::remove("zzz")));
        assert_eq!(mirror.others().len(), 1);
    }

    #[test]
    fn test_update_overwrites_record() {
        let mut mirror = PresenceMirror::new();
        mirror.apply(PresenceMessage::Update {
            id: "a".into(),
            x: 0.1,
            y: 0.1,
            country: Some("FR".into()),
            last_update: 1,
            pointer: PointerKind::Mouse,
        });
        mirror.apply(PresenceMessage::Update {
            id: "a".into(),
            x: 0.9,
            y: 0.2,
            country: None,
            last_update: 2,
            pointer: PointerKind::Touch,
        });

        let a = &mirror.others()["a"];
        assert_eq!((a.x, a.y), (0.9, 0.2));
        assert_eq!(a.country, None);
        assert_eq!(a.last_update, 2);
        assert_eq!(a.pointer, PointerKind::Touch);
    }

    #[test]
    fn test_events_apply_in_order() {
        let events = vec![
            update("a", 0.1, 0.1),
            update("b", 0.2, 0.2),
            PresenceMessage::remove("a"),
            update("c", 0.3, 0.3),
            update("b", 0.4, 0.4),
            PresenceMessage::remove("c"),
            update("a", 0.5, 0.5),
        ];

        let mut mirror = PresenceMirror::new();
        for event in events {
            mirror.apply(event);
        }

        let mut expected = CursorsMap::new();
        expected.insert("a".into(), record(0.5, 0.5));
        expected.insert("b".into(), record(0.4, 0.4));
        assert_eq!(*mirror.others(), expected);
    }

    #[test]
    fn test_sync_replaces_everything() {
        let mut mirror = PresenceMirror::new();
        mirror.apply(update("stale", 0.1, 0.1));

        let mut cursors = CursorsMap::new();
        cursors.insert("a".into(), record(0.2, 0.2));
        cursors.insert("b".into(), record(0.3, 0.3));

        assert!(mirror.apply(PresenceMessage::Sync {
            cursors: cursors.clone()
        }));
        assert_eq!(*mirror.others(), cursors);

        // Repeating the same sync is idempotent
        assert!(!mirror.apply(PresenceMessage::Sync {
            cursors: cursors.clone()
        }));
        assert_eq!(*mirror.others(), cursors);
    }

    #[test]
    fn test_local_agent_never_in_others() {
        let mut mirror = PresenceMirror::new();
        mirror.assign_id("me");

        assert!(!mirror.apply(update("me", 0.5, 0.5)));
        assert!(mirror.others().is_empty());

        let mut cursors = CursorsMap::new();
        cursors.insert("me".into(), record(0.2, 0.2));
        cursors.insert("a".into(), record(0.3, 0.3));
        mirror.apply(PresenceMessage::Sync { cursors });
        assert_eq!(mirror.others().len(), 1);
        assert!(mirror.others().contains_key("a"));
    }

    #[test]
    fn test_pointer_samples_are_normalized() {
        let mut mirror = PresenceMirror::new();

        // Unmeasured viewport drops the sample
        assert_eq!(mirror.pointer_moved(PointerSample::mouse(10.0, 10.0)), None);
        assert!(mirror.my_cursor().is_none());

        mirror.resize(800.0, 400.0);
        let intent = mirror.pointer_moved(PointerSample::mouse(200.0, 300.0));
        assert_eq!(
            intent,
            Some(CursorIntent::Move {
                x: 0.25,
                y: 0.75,
                pointer: PointerKind::Mouse
            })
        );
        assert_eq!(mirror.my_cursor().map(|c| (c.x, c.y)), Some((0.25, 0.75)));

        // Off-screen samples are clamped
        let intent = mirror.pointer_moved(PointerSample::touch(-5.0, 900.0));
        assert_eq!(
            intent,
            Some(CursorIntent::Move {
                x: 0.0,
                y: 1.0,
                pointer: PointerKind::Touch
            })
        );
    }

    #[test]
    fn test_resize_does_not_touch_remote_cursors() {
        let mut mirror = PresenceMirror::new();
        mirror.apply(update("a", 0.5, 0.5));
        mirror.resize(100.0, 100.0);
        mirror.resize(1920.0, 1080.0);
        assert_eq!(mirror.others()["a"], record(0.5, 0.5));
    }

    #[test]
    fn test_touch_end_clears_local_cursor() {
        let mut mirror = PresenceMirror::new();
        mirror.resize(100.0, 100.0);
        mirror.pointer_moved(PointerSample::touch(50.0, 50.0));
        assert!(mirror.my_cursor().is_some());

        assert!(mirror.touch_ended().is_idle());
        assert!(mirror.my_cursor().is_none());
    }

    #[test]
    fn test_disconnect_clears_others() {
        let mut mirror = PresenceMirror::new();
        mirror.set_connection(ConnectionState::Open);
        mirror.apply(update("a", 0.5, 0.5));
        assert_eq!(mirror.participant_count(), 2);

        mirror.set_connection(ConnectionState::Closed);
        assert!(mirror.others().is_empty());
        assert_eq!(mirror.participant_count(), 0);
    }

    #[test]
    fn test_views_are_snapshots() {
        let mut mirror = PresenceMirror::new();
        mirror.apply(update("a", 0.5, 0.5));
        let before = mirror.view();

        mirror.apply(update("b", 0.1, 0.1));
        mirror.apply(PresenceMessage::remove("a"));

        assert_eq!(before.others.len(), 1);
        assert!(before.others.contains_key("a"));
        assert_eq!(mirror.view().others.len(), 1);
        assert!(mirror.view().others.contains_key("b"));
    }
}
