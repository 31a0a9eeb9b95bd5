//! Streaming OSM XML parser
//!
//! Walks an `.osm` document with quick-xml and delivers batched records to a
//! [`MapHandler`]. Unknown elements are skipped; a `<node>`, `<way>` or
//! `<relation>` missing a required attribute is a fatal parse error.

use crate::osm::{
    CoordRecord, MapHandler, NodeRecord, OsmError, RelationRecord, Result, WayRecord,
};
use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Records buffered per callback before a batch is flushed
const BATCH_SIZE: usize = 1024;

/// Parse an `.osm` file and stream its records into the handler
pub fn parse_file<H: MapHandler>(path: &Path, handler: &mut H) -> Result<()> {
    let mut reader = Reader::from_file(path)?;
    reader.config_mut().trim_text(true);
    parse_reader(reader, handler)
}

/// Parse an OSM XML document from any buffered reader
pub fn parse<R: BufRead, H: MapHandler>(reader: R, handler: &mut H) -> Result<()> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);
    parse_reader(reader, handler)
}

/// The element currently being assembled from child `<tag>`/`<nd>`/`<member>`s
enum Pending {
    None,
    Node(NodeRecord),
    Way(WayRecord),
    Relation(RelationRecord),
}

/// Batches records and flushes them to the handler
struct Batcher<'a, H: MapHandler> {
    handler: &'a mut H,
    nodes: Vec<NodeRecord>,
    ways: Vec<WayRecord>,
    relations: Vec<RelationRecord>,
    coords: Vec<CoordRecord>,
}

impl<'a, H: MapHandler> Batcher<'a, H> {
    fn new(handler: &'a mut H) -> Self {
        Self {
            handler,
            nodes: Vec::new(),
            ways: Vec::new(),
            relations: Vec::new(),
            coords: Vec::new(),
        }
    }

    fn push(&mut self, pending: Pending) {
        match pending {
            Pending::None => {}
            Pending::Node(node) => {
                self.coords.push(CoordRecord {
                    id: node.id,
                    lng: node.lng,
                    lat: node.lat,
                });
                // Only tagged nodes are delivered on the node stream
                if !node.tags.is_empty() {
                    self.nodes.push(node);
                }
            }
            Pending::Way(way) => self.ways.push(way),
            Pending::Relation(relation) => self.relations.push(relation),
        }
        if self.coords.len() >= BATCH_SIZE {
            self.handler.on_coords(&self.coords);
            self.coords.clear();
        }
        if self.nodes.len() >= BATCH_SIZE {
            self.handler.on_nodes(&self.nodes);
            self.nodes.clear();
        }
        if self.ways.len() >= BATCH_SIZE {
            self.handler.on_ways(&self.ways);
            self.ways.clear();
        }
        if self.relations.len() >= BATCH_SIZE {
            self.handler.on_relations(&self.relations);
            self.relations.clear();
        }
    }

    fn finish(self) {
        if !self.coords.is_empty() {
            self.handler.on_coords(&self.coords);
        }
        if !self.nodes.is_empty() {
            self.handler.on_nodes(&self.nodes);
        }
        if !self.ways.is_empty() {
            self.handler.on_ways(&self.ways);
        }
        if !self.relations.is_empty() {
            self.handler.on_relations(&self.relations);
        }
    }
}

fn parse_reader<R: BufRead, H: MapHandler>(mut reader: Reader<R>, handler: &mut H) -> Result<()> {
    let mut batcher = Batcher::new(handler);
    let mut pending = Pending::None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                if let Some(started) = open_element(&element, &mut pending)? {
                    pending = started;
                }
            }
            Event::Empty(element) => {
                // Self-closing top-level elements complete immediately
                if let Some(started) = open_element(&element, &mut pending)? {
                    batcher.push(started);
                }
            }
            Event::End(element) => match element.name().as_ref() {
                b"node" | b"way" | b"relation" => {
                    batcher.push(std::mem::replace(&mut pending, Pending::None));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    batcher.finish();
    Ok(())
}

/// Handle an opening (or self-closing) element. Returns the record it starts,
/// if any; child elements mutate `pending` in place instead.
fn open_element(element: &BytesStart<'_>, pending: &mut Pending) -> Result<Option<Pending>> {
    match element.name().as_ref() {
        b"node" => Ok(Some(Pending::Node(parse_node(element)?))),
        b"way" => Ok(Some(Pending::Way(WayRecord {
            id: required_i64(element, "way", "id")?,
            tags: HashMap::new(),
            node_refs: Vec::new(),
        }))),
        b"relation" => Ok(Some(Pending::Relation(RelationRecord {
            id: required_i64(element, "relation", "id")?,
            tags: HashMap::new(),
            member_refs: Vec::new(),
        }))),
        b"nd" => {
            if let Pending::Way(way) = pending {
                way.node_refs.push(required_i64(element, "nd", "ref")?);
            }
            Ok(None)
        }
        b"tag" => {
            let mut key = None;
            let mut value = None;
            for attribute in element.attributes() {
                let attribute = attribute?;
                match attribute.key.as_ref() {
                    b"k" => key = Some(attribute_text(&attribute)?),
                    b"v" => value = Some(attribute_text(&attribute)?),
                    _ => {}
                }
            }
            if let (Some(key), Some(value)) = (key, value) {
                match pending {
                    Pending::Node(node) => {
                        node.tags.insert(key, value);
                    }
                    Pending::Way(way) => {
                        way.tags.insert(key, value);
                    }
                    Pending::Relation(relation) => {
                        relation.tags.insert(key, value);
                    }
                    Pending::None => {}
                }
            }
            Ok(None)
        }
        b"member" => {
            if let Pending::Relation(relation) = pending {
                relation.member_refs.push(required_i64(element, "member", "ref")?);
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn parse_node(element: &BytesStart<'_>) -> Result<NodeRecord> {
    Ok(NodeRecord {
        id: required_i64(element, "node", "id")?,
        tags: HashMap::new(),
        lat: required_f64(element, "node", "lat")?,
        lng: required_f64(element, "node", "lon")?,
    })
}

fn attribute_text(attribute: &Attribute<'_>) -> Result<String> {
    Ok(attribute.unescape_value()?.into_owned())
}

fn find_attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == name.as_bytes() {
            return Ok(Some(attribute_text(&attribute)?));
        }
    }
    Ok(None)
}

fn required_i64(element: &BytesStart<'_>, kind: &'static str, name: &str) -> Result<i64> {
    let text = find_attribute(element, name)?.ok_or_else(|| OsmError::Malformed {
        element: kind,
        reason: format!("missing {name} attribute"),
    })?;
    text.parse().map_err(|_| OsmError::Malformed {
        element: kind,
        reason: format!("non-integer {name}: {text:?}"),
    })
}

fn required_f64(element: &BytesStart<'_>, kind: &'static str, name: &str) -> Result<f64> {
    let text = find_attribute(element, name)?.ok_or_else(|| OsmError::Malformed {
        element: kind,
        reason: format!("missing {name} attribute"),
    })?;
    text.parse().map_err(|_| OsmError::Malformed {
        element: kind,
        reason: format!("non-numeric {name}: {text:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::RoadMap;
    use std::io::Cursor;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="1" lat="42.0" lon="-71.0"/>
  <node id="2" lat="42.001" lon="-71.0">
    <tag k="amenity" v="cafe"/>
  </node>
  <node id="3" lat="42.002" lon="-71.001"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
  </way>
  <way id="11">
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="railway" v="rail"/>
  </way>
  <relation id="20">
    <member type="way" ref="10" role="outer"/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>"#;

    /// Records every callback for assertions
    #[derive(Default)]
    struct Recorder {
        nodes: Vec<NodeRecord>,
        ways: Vec<WayRecord>,
        relations: Vec<RelationRecord>,
        coords: Vec<CoordRecord>,
    }

    impl MapHandler for Recorder {
        fn on_nodes(&mut self, nodes: &[NodeRecord]) {
            self.nodes.extend_from_slice(nodes);
        }
        fn on_ways(&mut self, ways: &[WayRecord]) {
            self.ways.extend_from_slice(ways);
        }
        fn on_relations(&mut self, relations: &[RelationRecord]) {
            self.relations.extend_from_slice(relations);
        }
        fn on_coords(&mut self, coords: &[CoordRecord]) {
            self.coords.extend_from_slice(coords);
        }
    }

    #[test]
    fn test_all_four_streams_delivered() {
        let mut recorder = Recorder::default();
        parse(Cursor::new(SAMPLE), &mut recorder).unwrap();

        // All nodes appear on the coordinate stream, only tagged ones on nodes
        assert_eq!(recorder.coords.len(), 3);
        assert_eq!(recorder.nodes.len(), 1);
        assert_eq!(recorder.nodes[0].tags["amenity"], "cafe");

        assert_eq!(recorder.ways.len(), 2);
        assert_eq!(recorder.ways[0].node_refs, vec![1, 2]);
        assert_eq!(recorder.ways[0].tags["highway"], "residential");

        assert_eq!(recorder.relations.len(), 1);
        assert_eq!(recorder.relations[0].member_refs, vec![10]);
    }

    #[test]
    fn test_coord_records_carry_lng_lat() {
        let mut recorder = Recorder::default();
        parse(Cursor::new(SAMPLE), &mut recorder).unwrap();

        let first = recorder.coords[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.lat, 42.0);
        assert_eq!(first.lng, -71.0);
    }

    #[test]
    fn test_feeds_road_map() {
        let mut map = RoadMap::new();
        parse(Cursor::new(SAMPLE), &mut map).unwrap();

        assert_eq!(map.class_count(), 2);
        assert_eq!(map.coord_count(), 3);
        assert_eq!(map.coord(2), Some((42.001, -71.0)));
    }

    #[test]
    fn test_missing_node_coordinate_is_fatal() {
        let doc = r#"<osm><node id="1" lat="42.0"/></osm>"#;
        let mut map = RoadMap::new();
        let result = parse(Cursor::new(doc), &mut map);
        assert!(matches!(result, Err(OsmError::Malformed { .. })));
    }

    #[test]
    fn test_invalid_attribute_escape_is_fatal() {
        let doc = r#"<osm><node id="1" lat="0.5" lon="0.5">
            <tag k="name" v="&bogus;"/></node></osm>"#;
        let mut recorder = Recorder::default();
        let result = parse(Cursor::new(doc), &mut recorder);
        assert!(matches!(result, Err(OsmError::Xml(_))));
    }

    #[test]
    fn test_unknown_elements_skipped() {
        let doc = r#"<osm><bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
            <node id="1" lat="0.5" lon="0.5"/></osm>"#;
        let mut recorder = Recorder::default();
        parse(Cursor::new(doc), &mut recorder).unwrap();
        assert_eq!(recorder.coords.len(), 1);
    }
}
