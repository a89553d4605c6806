// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::osm::Way;

/// Direction of travel on a one-way street, expressed as the node at which
/// legal travel leaves the way.
///
/// Two facts are equal if both the way and the exit node match. A way can't be one-way
/// in both directions, so every way produces at most one [Oneway].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oneway {
    /// Absolute value of the way's identifier.
    pub way_id: u64,

    /// Absolute value of the identifier of the first or last node of the way,
    /// depending on the direction of travel.
    pub exit_node: u64,
}

impl Oneway {
    /// Checks if a way is a one-way street, and if so, returns its [Oneway] fact.
    ///
    /// Only ways with both `highway` and `oneway` tags are considered. Such a way is one-way if:
    /// - `oneway` is one of `yes`, `1`, `true` or `-1`,
    /// - `junction=roundabout`, regardless of the `oneway` value, or
    /// - `highway=motorway`, unless `oneway=no`.
    ///
    /// `oneway=-1` reverses the direction of travel, making the first node the exit node.
    /// Otherwise, travel leaves the way at its last node. Ways without any nodes
    /// have no exit node and are never one-way.
    pub fn from_way(w: &Way) -> Option<Self> {
        let (highway, oneway) = match (w.tag("highway"), w.tag("oneway")) {
            (Some(highway), Some(oneway)) => (highway, oneway),
            _ => return None,
        };

        let explicit = matches!(oneway, "yes" | "1" | "true" | "-1");
        let roundabout = w.tag("junction") == Some("roundabout");
        let motorway = highway == "motorway" && oneway != "no";

        if !explicit && !roundabout && !motorway {
            return None;
        }

        let exit = if oneway == "-1" {
            w.nodes.first()
        } else {
            w.nodes.last()
        };

        exit.map(|&node_id| Oneway {
            way_id: w.id.unsigned_abs(),
            exit_node: node_id.unsigned_abs(),
        })
    }
}
