// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{FactStore, Oneway, Restriction};

/// A [Restriction] prohibiting a maneuver which is already impossible,
/// as travel on its `to` way can only leave (and never enter) through its `via` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RedundantRestriction {
    pub restriction_id: u64,
    pub from_way: u64,
    pub via_node: u64,
    pub to_way: u64,
}

impl From<&Restriction> for RedundantRestriction {
    fn from(r: &Restriction) -> Self {
        Self {
            restriction_id: r.id,
            from_way: r.from_way,
            via_node: r.via_node,
            to_way: r.to_way,
        }
    }
}

impl std::fmt::Display for RedundantRestriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.restriction_id, self.from_way, self.via_node, self.to_way
        )
    }
}

/// Checks whether the `to` way of a [Restriction] is a one-way street exiting at the `via` node.
pub fn is_redundant(store: &FactStore, r: &Restriction) -> bool {
    store.contains_oneway(&Oneway {
        way_id: r.to_way,
        exit_node: r.via_node,
    })
}

/// Returns all [Restrictions](Restriction) from a fully-populated [FactStore]
/// which are [redundant](RedundantRestriction), in the store's (unspecified) iteration order.
pub fn find_redundant_restrictions(
    store: &FactStore,
) -> impl Iterator<Item = RedundantRestriction> + '_ {
    store
        .restrictions()
        .iter()
        .filter(move |r| is_redundant(store, r))
        .map(RedundantRestriction::from)
}
