//! OSM Ingestion Module
//!
//! Streams records out of an OpenStreetMap XML file and buckets them for the
//! compositing stage:
//! - [`parser`] walks the XML and batches node / way / relation / coordinate
//!   records into callbacks.
//! - [`MapHandler`] is the four-callback capability object those batches are
//!   delivered to.
//! - [`RoadMap`] is the handler used by the plotting pipeline: it buckets ways
//!   by road or rail class and retains every node coordinate for later
//!   resolution.
//!
//! The whole node/way universe of the input is kept in memory; projection and
//! weighting only run after parsing completes.

mod handler;
mod parser;

pub use handler::{MapHandler, RoadMap};
pub use parser::{parse, parse_file};

use std::collections::HashMap;

/// Error types for the OSM module
#[derive(Debug, thiserror::Error)]
pub enum OsmError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attributes: {0}")]
    Attributes(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid <{element}> record: {reason}")]
    Malformed {
        element: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OsmError>;

/// A tagged node record
#[derive(Clone, Debug)]
pub struct NodeRecord {
    pub id: i64,
    pub tags: HashMap<String, String>,
    pub lng: f64,
    pub lat: f64,
}

/// A way record: id, tag mapping, and the ordered node-id sequence
#[derive(Clone, Debug)]
pub struct WayRecord {
    pub id: i64,
    pub tags: HashMap<String, String>,
    pub node_refs: Vec<i64>,
}

/// A relation record; delivered but not interpreted by the pipeline
#[derive(Clone, Debug)]
pub struct RelationRecord {
    pub id: i64,
    pub tags: HashMap<String, String>,
    pub member_refs: Vec<i64>,
}

/// A bare node coordinate record
#[derive(Clone, Copy, Debug)]
pub struct CoordRecord {
    pub id: i64,
    pub lng: f64,
    pub lat: f64,
}
