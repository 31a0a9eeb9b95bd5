//! Callback handlers for streamed OSM records

use crate::osm::{CoordRecord, NodeRecord, RelationRecord, WayRecord};
use std::collections::HashMap;

/// Capability object receiving the four OSM record streams.
///
/// Every callback has an empty default body, so a handler only implements the
/// streams it cares about.
pub trait MapHandler {
    fn on_nodes(&mut self, _nodes: &[NodeRecord]) {}
    fn on_ways(&mut self, _ways: &[WayRecord]) {}
    fn on_relations(&mut self, _relations: &[RelationRecord]) {}
    fn on_coords(&mut self, _coords: &[CoordRecord]) {}
}

/// Buckets ways by road/rail class and retains all node coordinates.
///
/// Ways are keyed by their `highway` tag value when present, and under the
/// literal key `railway` when a railway tag is present. A way carrying both
/// tags is recorded twice, once per bucket.
#[derive(Debug, Default)]
pub struct RoadMap {
    /// node id -> (lat, lng)
    coords: HashMap<i64, (f64, f64)>,
    /// class key -> node-id sequences of every way in that class
    ways: HashMap<String, Vec<Vec<i64>>>,
}

impl RoadMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a node id to its (lat, lng) coordinate
    pub fn coord(&self, id: i64) -> Option<(f64, f64)> {
        self.coords.get(&id).copied()
    }

    /// Iterate over the ingested classes and their ways
    pub fn classes(&self) -> impl Iterator<Item = (&str, &[Vec<i64>])> {
        self.ways
            .iter()
            .map(|(class, ways)| (class.as_str(), ways.as_slice()))
    }

    /// Number of distinct way classes seen
    pub fn class_count(&self) -> usize {
        self.ways.len()
    }

    /// Number of retained node coordinates
    pub fn coord_count(&self) -> usize {
        self.coords.len()
    }

    /// Total number of bucketed ways, counting double-tagged ways twice
    pub fn way_count(&self) -> usize {
        self.ways.values().map(Vec::len).sum()
    }
}

impl MapHandler for RoadMap {
    fn on_ways(&mut self, ways: &[WayRecord]) {
        for way in ways {
            if let Some(class) = way.tags.get("highway") {
                self.ways
                    .entry(class.clone())
                    .or_default()
                    .push(way.node_refs.clone());
            }
            if way.tags.contains_key("railway") {
                self.ways
                    .entry("railway".to_string())
                    .or_default()
                    .push(way.node_refs.clone());
            }
        }
    }

    fn on_coords(&mut self, coords: &[CoordRecord]) {
        for coord in coords {
            self.coords.insert(coord.id, (coord.lat, coord.lng));
        }
    }
}
