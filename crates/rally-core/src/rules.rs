//! Set predicates.
//!
//! A rule decides whether a group of cards forms a valid set. Rules are pure:
//! the same cards always give the same answer and nothing is mutated.

use rally_protocol::Card;
use serde_json::Value;
use std::collections::BTreeSet;

/// A pure "is this group a valid set" predicate.
pub trait SetRule: Send + Sync {
    /// Evaluate a group of cards.
    fn is_set(&self, cards: &[&Card]) -> bool;
}

impl<F> SetRule for F
where
    F: Fn(&[&Card]) -> bool + Send + Sync,
{
    fn is_set(&self, cards: &[&Card]) -> bool {
        self(cards)
    }
}

/// The classic set rule over arbitrary attributes.
///
/// For every attribute name found on any card, the values must be either all
/// equal or all pairwise different. A card missing an attribute counts as
/// `null` for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeSetRule;

impl SetRule for AttributeSetRule {
    fn is_set(&self, cards: &[&Card]) -> bool {
        if cards.len() < 2 {
            return false;
        }

        let names: BTreeSet<&str> = cards
            .iter()
            .flat_map(|card| card.attributes.keys().map(String::as_str))
            .collect();

        names.into_iter().all(|name| {
            let values: Vec<&Value> = cards
                .iter()
                .map(|card| card.attribute(name).unwrap_or(&Value::Null))
                .collect();
            all_same(&values) || all_different(&values)
        })
    }
}

fn all_same(values: &[&Value]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

fn all_different(values: &[&Value]) -> bool {
    values
        .iter()
        .enumerate()
        .all(|(i, a)| values[i + 1..].iter().all(|b| a != b))
}
