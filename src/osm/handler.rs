// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{Relation, Way};

/// Visitor receiving [OSM features](super::Feature) during a single pass over a file.
///
/// Every way and relation is delivered exactly once, in file order. Nodes are
/// never delivered. Implementors should not assume that all ways come before
/// relations, even though that's how well-formed OSM files are sorted.
pub trait Handler {
    fn way(&mut self, _way: &Way) {}
    fn relation(&mut self, _relation: &Relation) {}
}
