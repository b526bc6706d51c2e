//! Property tests for the reconciliation state machines.

use proptest::prelude::*;
use rally_protocol::{Board, Card, CursorRecord, CursorsMap, PointerKind, PresenceMessage};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::effects::{EffectFlags, FlashKind};
use crate::game::MatchGame;
use crate::presence::PresenceMirror;
use crate::selection::{Selection, SET_SIZE};
use crate::session::SessionMirror;

const AGENTS: &[&str] = &["a", "b", "c", "d", "me"];
const COUNTRIES: &[&str] = &["DE", "JP", "US"];
const CARDS: &[&str] = &["c1", "c2", "c3", "c4", "c5", "c6"];

const FLASH: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
enum Event {
    Update(String, CursorRecord),
    Remove(String),
}

impl Event {
    fn message(&self) -> PresenceMessage {
        match self {
            Event::Update(id, record) => PresenceMessage::update(id.clone(), record.clone()),
            Event::Remove(id) => PresenceMessage::remove(id.clone()),
        }
    }
}

fn agent() -> impl Strategy<Value = String> {
    prop::sample::select(AGENTS).prop_map(str::to_string)
}

fn card_id() -> impl Strategy<Value = String> {
    prop::sample::select(CARDS).prop_map(str::to_string)
}

fn record() -> impl Strategy<Value = CursorRecord> {
    (
        0.0..=1.0f64,
        0.0..=1.0f64,
        prop::option::of(prop::sample::select(COUNTRIES)),
        any::<u64>(),
        prop_oneof![Just(PointerKind::Mouse), Just(PointerKind::Touch)],
    )
        .prop_map(|(x, y, country, last_update, pointer)| CursorRecord {
            x,
            y,
            country: country.map(str::to_string),
            last_update,
            pointer,
        })
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => (agent(), record()).prop_map(|(id, record)| Event::Update(id, record)),
        1 => agent().prop_map(Event::Remove),
    ]
}

/// Apply events one by one to a plain map, skipping the local agent.
fn fold(events: &[Event], me: Option<&str>) -> CursorsMap {
    let mut expected = CursorsMap::new();
    for event in events {
        match event {
            Event::Update(id, _) if Some(id.as_str()) == me => {}
            Event::Update(id, record) => {
                expected.insert(id.clone(), record.clone());
            }
            Event::Remove(id) => {
                expected.remove(id);
            }
        }
    }
    expected
}

fn board() -> Board {
    CARDS
        .chunks(3)
        .map(|row| row.iter().map(|id| Card::new(*id)).collect())
        .collect()
}

fn first_before_second(cards: &[&Card]) -> bool {
    cards[0].id < cards[1].id
}

fn id_set(selection: &Selection) -> BTreeSet<String> {
    selection.ids().iter().cloned().collect()
}

proptest! {
    #[test]
    fn prop_events_match_in_order_fold(events in prop::collection::vec(event(), 0..64)) {
        let mut mirror = PresenceMirror::new();
        for event in &events {
            mirror.apply(event.message());
        }
        prop_assert_eq!(mirror.others(), &fold(&events, None));
    }

    #[test]
    fn prop_local_agent_is_never_mirrored(events in prop::collection::vec(event(), 0..64)) {
        let mut mirror = PresenceMirror::new();
        mirror.assign_id("me");
        for event in &events {
            mirror.apply(event.message());
            prop_assert!(!mirror.others().contains_key("me"));
        }
        prop_assert_eq!(mirror.others(), &fold(&events, Some("me")));
    }

    #[test]
    fn prop_sync_replaces_and_is_idempotent(
        before in prop::collection::vec(event(), 0..32),
        cursors in prop::collection::hash_map(agent(), record(), 0..5),
    ) {
        let mut mirror = PresenceMirror::new();
        for event in &before {
            mirror.apply(event.message());
        }

        mirror.apply(PresenceMessage::Sync { cursors: cursors.clone() });
        prop_assert_eq!(mirror.others(), &cursors);

        let resync = PresenceMessage::Sync { cursors: cursors.clone() };
        prop_assert!(!mirror.apply(resync));
        prop_assert_eq!(mirror.others(), &cursors);
    }

    #[test]
    fn prop_toggle_twice_restores_selection(
        prior in prop::collection::vec(card_id(), 0..8),
        id in card_id(),
    ) {
        let mut selection = Selection::new();
        for picked in prior {
            selection.toggle(picked);
        }
        let before = id_set(&selection);

        selection.toggle(id.clone());
        selection.toggle(id);

        prop_assert_eq!(id_set(&selection), before);
        prop_assert!(selection.len() <= SET_SIZE);
    }

    #[test]
    fn prop_each_cycle_sends_once_and_flashes_one_set(
        picks in prop::collection::vec(card_id(), 0..48),
    ) {
        let mut game = MatchGame::with_rule(
            SessionMirror::from_snapshot(board(), 0),
            Arc::new(first_before_second),
            FLASH,
        );
        let mut model = Selection::new();
        let now = Instant::now();

        for id in picks {
            let completes = model.toggle(id.clone());
            let evaluation = game.select(id, now).unwrap();
            prop_assert_eq!(evaluation.is_some(), completes);

            match evaluation {
                Some(evaluation) => {
                    let expected = model.take_set().unwrap();
                    prop_assert_eq!(&evaluation.attempt.selected_ids, &expected);
                    prop_assert!(game.selection().is_empty());

                    let effects = game.effects();
                    let (lit, dark) = if evaluation.is_set {
                        (effects.win(), effects.lose())
                    } else {
                        (effects.lose(), effects.win())
                    };
                    prop_assert_eq!(lit, &expected[..]);
                    prop_assert!(dark.is_empty());
                }
                None => {
                    prop_assert_eq!(game.selection().ids(), model.ids());
                }
            }
        }
    }

    #[test]
    fn prop_flash_clears_at_deadline(
        steps in prop::collection::vec((any::<bool>(), 0u64..600), 1..16),
    ) {
        let mut flags = EffectFlags::new(FLASH);
        let mut now = Instant::now();

        for (i, (win, wait)) in steps.into_iter().enumerate() {
            let ids = vec![format!("c{i}")];
            let kind = if win { FlashKind::Win } else { FlashKind::Lose };
            flags.flash(kind, ids.clone(), now);
            prop_assert!(flags.win().is_empty() || flags.lose().is_empty());

            now += Duration::from_millis(wait);
            let expired = flags.expire(now);
            prop_assert_eq!(expired, wait >= 300);

            if expired {
                prop_assert!(flags.win().is_empty() && flags.lose().is_empty());
                prop_assert!(flags.next_deadline().is_none());
            } else {
                let lit = if win { flags.win() } else { flags.lose() };
                prop_assert_eq!(lit, &ids[..]);
            }
        }
    }
}
