// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use crate::osm::{Handler, Relation, Way};
use crate::{Oneway, Restriction};

/// Counters describing a pass over an OSM file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Number of ways seen, one-way or not.
    pub ways: usize,

    /// Number of relations seen, turn restrictions or not.
    pub relations: usize,

    /// Number of candidate turn restrictions skipped because their members
    /// don't follow the from (way), via (node), to (way) schema.
    pub malformed_restrictions: usize,
}

/// Deduplicated collections of [Oneway] and [Restriction] facts.
///
/// Inserting a fact equal to an already-stored one is a no-op:
/// the first inserted fact is kept as the representative. This matters for
/// [Restriction]s, where equal facts may carry different relation ids.
///
/// FactStore is a [Handler], so it can be filled directly by the [osm readers](crate::osm).
#[derive(Debug, Default, Clone)]
pub struct FactStore {
    oneways: HashSet<Oneway>,
    restrictions: HashSet<Restriction>,
    stats: Stats,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a [Oneway], returning `true` if an equal fact wasn't already present.
    pub fn insert_oneway(&mut self, oneway: Oneway) -> bool {
        self.oneways.insert(oneway)
    }

    /// Stores a [Restriction], returning `true` if an equal fact wasn't already present.
    /// If it was, the stored restriction (including its id) is left untouched.
    pub fn insert_restriction(&mut self, restriction: Restriction) -> bool {
        self.restrictions.insert(restriction)
    }

    pub fn oneways(&self) -> &HashSet<Oneway> {
        &self.oneways
    }

    pub fn restrictions(&self) -> &HashSet<Restriction> {
        &self.restrictions
    }

    pub fn contains_oneway(&self, oneway: &Oneway) -> bool {
        self.oneways.contains(oneway)
    }

    /// Returns the stored [Oneway] equal to the provided one.
    pub fn get_oneway(&self, oneway: &Oneway) -> Option<&Oneway> {
        self.oneways.get(oneway)
    }

    /// Returns the stored representative of all [Restriction]s equal to the provided one.
    pub fn get_restriction(&self, restriction: &Restriction) -> Option<&Restriction> {
        self.restrictions.get(restriction)
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }
}

impl Handler for FactStore {
    fn way(&mut self, way: &Way) {
        self.stats.ways += 1;
        if let Some(oneway) = Oneway::from_way(way) {
            self.insert_oneway(oneway);
        }
    }

    fn relation(&mut self, relation: &Relation) {
        self.stats.relations += 1;
        match Restriction::from_relation(relation) {
            Ok(Some(restriction)) => {
                self.insert_restriction(restriction);
            }
            Ok(None) => {}
            Err(_) => self.stats.malformed_restrictions += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::{FeatureType, RelationMember};
    use std::collections::HashMap;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    fn restriction_relation(id: i64, from: i64, via: i64, to: i64) -> Relation {
        Relation {
            id,
            members: vec![
                RelationMember {
                    type_: FeatureType::Way,
                    ref_: from,
                    role: "from".to_string(),
                },
                RelationMember {
                    type_: FeatureType::Node,
                    ref_: via,
                    role: "via".to_string(),
                },
                RelationMember {
                    type_: FeatureType::Way,
                    ref_: to,
                    role: "to".to_string(),
                },
            ],
            tags: tags! {"type": "restriction", "restriction": "no_left_turn"},
        }
    }

    #[test]
    fn oneways_are_deduplicated() {
        let mut store = FactStore::new();
        let w = Way {
            id: 10,
            nodes: vec![1, 5],
            tags: tags! {"highway": "primary", "oneway": "yes"},
        };
        let reversed_placeholder = Way {
            id: -10,
            nodes: vec![-5, -1],
            tags: tags! {"highway": "primary", "oneway": "-1"},
        };

        store.way(&w);
        store.way(&w);
        store.way(&reversed_placeholder);

        assert_eq!(store.oneways().len(), 1);
        assert!(store.contains_oneway(&Oneway {
            way_id: 10,
            exit_node: 5
        }));
        assert_eq!(store.stats().ways, 3);
    }

    #[test]
    fn restrictions_are_deduplicated_by_maneuver() {
        let mut store = FactStore::new();
        store.relation(&restriction_relation(99, 7, 5, 10));
        store.relation(&restriction_relation(100, 7, 5, 10));
        store.relation(&restriction_relation(-99, -7, -5, -10));
        store.relation(&restriction_relation(101, 7, 5, 11));

        assert_eq!(store.restrictions().len(), 2);
        assert_eq!(store.stats().relations, 4);
    }

    #[test]
    fn first_restriction_is_the_representative() {
        let mut store = FactStore::new();
        let first = Restriction {
            id: 1,
            from_way: 7,
            via_node: 5,
            to_way: 10,
        };
        let second = Restriction { id: 2, ..first };

        assert!(store.insert_restriction(first));
        assert!(!store.insert_restriction(second));

        assert_eq!(store.get_restriction(&first).map(|r| r.id), Some(1));
        assert_eq!(store.get_restriction(&second).map(|r| r.id), Some(1));
        assert_eq!(store.restrictions().iter().next().map(|r| r.id), Some(1));
    }

    #[test]
    fn get_oneway() {
        let mut store = FactStore::new();
        let oneway = Oneway {
            way_id: 10,
            exit_node: 5,
        };

        assert_eq!(store.get_oneway(&oneway), None);
        assert!(store.insert_oneway(oneway));
        assert!(!store.insert_oneway(oneway));
        assert_eq!(store.get_oneway(&oneway), Some(&oneway));
    }

    #[test]
    fn counts_malformed_restrictions() {
        let mut store = FactStore::new();

        let mut via_way = restriction_relation(1, 7, 5, 10);
        via_way.members[1].type_ = FeatureType::Way;
        store.relation(&via_way);

        let mut only = restriction_relation(2, 7, 5, 10);
        only.tags = tags! {"restriction": "only_left_turn"};
        store.relation(&only);

        store.relation(&Relation {
            id: 3,
            members: vec![],
            tags: tags! {"type": "multipolygon"},
        });

        assert!(store.restrictions().is_empty());
        assert_eq!(
            store.stats(),
            Stats {
                ways: 0,
                relations: 3,
                malformed_restrictions: 1,
            }
        );
    }
}
