// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Detection of redundant [OpenStreetMap](https://www.openstreetmap.org/)
//! [turn restrictions](https://wiki.openstreetmap.org/wiki/Relation:restriction).
//!
//! A `no_*` turn restriction is redundant if the street it prohibits turning onto
//! is a one-way street, and travel on that street can only leave it through the
//! restriction's junction node. Such maneuvers are already impossible, and the
//! restriction adds no information.
//!
//! The check is a single read-only pass: every way and relation from an OSM file
//! is classified into a [FactStore] (through its [osm::Handler] implementation),
//! after which [find_redundant_restrictions] matches the stored facts.
//!
//! # Example
//!
//! ```no_run
//! let mut store = redundant_restrictions::FactStore::new();
//! redundant_restrictions::osm::add_features_from_file(
//!     &mut store,
//!     redundant_restrictions::osm::FileFormat::Unknown,
//!     "path/to/monaco.osm.pbf",
//! ).expect("failed to load monaco.osm.pbf");
//!
//! for r in redundant_restrictions::find_redundant_restrictions(&store) {
//!     println!("{}", r);
//! }
//! ```

mod facts;
mod oneway;
pub mod osm;
mod redundancy;
mod restriction;

pub use facts::{FactStore, Stats};
pub use oneway::Oneway;
pub use redundancy::{find_redundant_restrictions, is_redundant, RedundantRestriction};
pub use restriction::{InvalidRestriction, Restriction};

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_XML: &[u8] = include_bytes!("osm/reader/test_fixtures/simple.osm");
    const SIMPLE_PBF: &[u8] = include_bytes!("osm/reader/test_fixtures/simple.osm.pbf");

    fn load(data: &[u8]) -> FactStore {
        let mut store = FactStore::new();
        osm::add_features_from_buffer(&mut store, osm::FileFormat::Unknown, data).unwrap();
        store
    }

    fn check_simple_store(store: &FactStore) {
        //                 -9
        //                / │
        //   -107 (rail) /  │ -106 motorway ↑
        //              /   │
        //  -1 ─────── -2  -8
        //       -100   │   │ -105 motorway, oneway=no
        //              │   -7
        //  -101 ↓      │   │ -104 (junction=roundabout, no oneway)
        //              -3  -6
        //  -102 ↑      │  /  \
        //              -4 ── -5   -103 roundabout

        let mut oneways: Vec<_> = store.oneways().iter().copied().collect();
        oneways.sort();
        assert_eq!(
            oneways,
            vec![
                Oneway {
                    way_id: 101,
                    exit_node: 3
                },
                Oneway {
                    way_id: 102,
                    exit_node: 3
                },
                Oneway {
                    way_id: 103,
                    exit_node: 4
                },
                Oneway {
                    way_id: 106,
                    exit_node: 9
                },
            ]
        );

        let mut restriction_ids: Vec<_> = store.restrictions().iter().map(|r| r.id).collect();
        restriction_ids.sort();
        // 202: only_*, 203: except=motorcar, 205: duplicate of 201, 206-208: malformed
        assert_eq!(restriction_ids, vec![200, 201, 204]);

        assert_eq!(
            store.stats(),
            Stats {
                ways: 8,
                relations: 9,
                malformed_restrictions: 3,
            }
        );

        let mut redundant: Vec<_> = find_redundant_restrictions(store).collect();
        redundant.sort();
        assert_eq!(
            redundant,
            vec![
                RedundantRestriction {
                    restriction_id: 201,
                    from_way: 101,
                    via_node: 3,
                    to_way: 102,
                },
                RedundantRestriction {
                    restriction_id: 204,
                    from_way: 107,
                    via_node: 9,
                    to_way: 106,
                },
            ]
        );
    }

    #[test]
    fn simple_xml() {
        check_simple_store(&load(SIMPLE_XML));
    }

    #[test]
    fn simple_pbf() {
        check_simple_store(&load(SIMPLE_PBF));
    }
}
