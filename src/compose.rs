//! Weighted compositing of classified ways into plottable paths
//!
//! Each recognized way class is projected, buffered by its weight, cropped to
//! a margin-expanded page rectangle, unioned with every other class, cropped
//! again to the exact page rectangle, and finally decomposed back into plain
//! line paths with a three-box page frame appended.

use crate::drawing::Drawing;
use crate::osm::RoadMap;
use crate::projection::AzimuthalEqualArea;
use geo::{
    BooleanOps, Buffer, Coord, Geometry, GeometryCollection, LineString, MultiLineString,
    MultiPolygon, Polygon, Rect,
};

/// Error types for the compositing module
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("unhandled geometry in path extraction: {0}")]
    UnsupportedGeometry(&'static str),
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Buffer weight per way class. Weight 0 leaves raw centerlines; weight > 0
/// thickens centerlines by `lane_width * weight` before compositing.
pub const CLASS_WEIGHTS: &[(&str, f64)] = &[
    ("motorway", 2.0),
    ("motorway_link", 2.0),
    ("trunk", 2.0),
    ("trunk_link", 2.0),
    ("primary", 1.75),
    ("primary_link", 1.75),
    ("secondary", 1.5),
    ("secondary_link", 1.5),
    ("tertiary", 1.25),
    ("tertiary_link", 1.25),
    ("living_street", 1.0),
    ("unclassified", 1.0),
    ("residential", 1.0),
    ("service", 0.0),
    ("railway", 0.0),
];

/// Weight for a way class, or None for classes excluded from compositing
pub fn class_weight(class: &str) -> Option<f64> {
    CLASS_WEIGHTS
        .iter()
        .find(|(key, _)| *key == class)
        .map(|(_, weight)| *weight)
}

/// Page geometry and buffering parameters, in projected units (kilometers)
#[derive(Clone, Debug)]
pub struct ComposeOptions {
    /// Page width of the cropped map
    pub page_width: f64,
    /// Page height of the cropped map
    pub page_height: f64,
    /// Width of one road lane, in meters
    pub lane_width_m: f64,
    /// Expansion factor for the pre-union crop rectangle
    pub margin: f64,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            page_width: 3.22,
            page_height: 3.22 * 8.5 / 12.0,
            lane_width_m: 3.7,
            margin: 1.2,
        }
    }
}

/// Compose every recognized class of the ingested map into a drawing.
///
/// Cropping happens twice on purpose: once generously (margin-expanded)
/// per class before the union, so buffered edges near the page boundary keep
/// their neighboring context, and once exactly at the page rectangle after
/// the union. Collapsing the two crops changes rendered output at the edges.
pub fn compose(
    map: &RoadMap,
    projection: &AzimuthalEqualArea,
    options: &ComposeOptions,
) -> Result<Drawing> {
    let expanded = page_rect(
        options.page_width * options.margin,
        options.page_height * options.margin,
    );

    let mut regions: Vec<MultiPolygon<f64>> = Vec::new();
    let mut centerlines: Vec<LineString<f64>> = Vec::new();
    for (class, ways) in map.classes() {
        let Some(weight) = class_weight(class) else {
            tracing::debug!("skipping unrecognized way class {class:?}");
            continue;
        };

        let lines = project_ways(map, projection, ways, class);
        if lines.0.is_empty() {
            continue;
        }

        if weight > 0.0 {
            let buffered = lines.buffer(options.lane_width_m / 1000.0 * weight);
            regions.push(crop_region(&buffered, expanded));
        } else {
            centerlines.extend(crop_lines(&lines, expanded).0);
        }
    }

    // Union all buffered classes, then crop everything to the exact page
    let page = page_rect(options.page_width, options.page_height);
    let unioned = regions
        .into_iter()
        .fold(MultiPolygon::<f64>::new(Vec::new()), |acc, region| {
            acc.union(&region)
        });
    let region = crop_region(&unioned, page);

    // Centerline segments covered by a buffered class are absorbed into its
    // region; only the uncovered segments remain standalone strokes
    let mut lines = crop_lines(&MultiLineString::new(centerlines), page);
    if !region.0.is_empty() {
        lines = region.clip(&lines, true);
    }

    let composite = Geometry::GeometryCollection(GeometryCollection::from(vec![
        Geometry::MultiPolygon(region),
        Geometry::MultiLineString(lines),
    ]));

    let mut paths = extract_paths(&composite)?;
    paths.extend(page_frames(options.page_width, options.page_height));
    Ok(Drawing::new(paths))
}

/// Resolve each way's node ids through the projection, dropping ways that
/// resolve to fewer than two points
fn project_ways(
    map: &RoadMap,
    projection: &AzimuthalEqualArea,
    ways: &[Vec<i64>],
    class: &str,
) -> MultiLineString<f64> {
    let mut missing = 0usize;
    let lines = ways
        .iter()
        .filter_map(|way| {
            let coords: Vec<Coord<f64>> = way
                .iter()
                .filter_map(|id| match map.coord(*id) {
                    Some((lat, lng)) => Some(projection.project(lat, lng)),
                    None => {
                        missing += 1;
                        None
                    }
                })
                .collect();
            (coords.len() >= 2).then(|| LineString::new(coords))
        })
        .collect();
    if missing > 0 {
        tracing::warn!("{missing} unresolved node refs in class {class:?}");
    }
    MultiLineString::new(lines)
}

/// Centered page rectangle of the given size
fn page_rect(width: f64, height: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: -width / 2.0,
            y: -height / 2.0,
        },
        Coord {
            x: width / 2.0,
            y: height / 2.0,
        },
    )
}

/// Crop an area region to a rectangle
fn crop_region(region: &MultiPolygon<f64>, rect: Rect<f64>) -> MultiPolygon<f64> {
    region.intersection(&MultiPolygon::new(vec![rect.to_polygon()]))
}

/// Crop centerlines to a rectangle
fn crop_lines(lines: &MultiLineString<f64>, rect: Rect<f64>) -> MultiLineString<f64> {
    rect.to_polygon().clip(lines, false)
}

/// Recursively decompose a composite geometry into plain line paths: a line
/// extracts as itself, a polygon as its exterior followed by each hole, and a
/// collection as the concatenation of its members. Anything else is a fatal
/// classification error. Paths with fewer than two points are excluded.
pub fn extract_paths(geometry: &Geometry<f64>) -> Result<Vec<LineString<f64>>> {
    let mut paths = Vec::new();
    extract_into(geometry, &mut paths)?;
    paths.retain(|path| path.0.len() >= 2);
    Ok(paths)
}

fn extract_into(geometry: &Geometry<f64>, paths: &mut Vec<LineString<f64>>) -> Result<()> {
    match geometry {
        Geometry::Line(line) => paths.push(LineString::from(vec![line.start, line.end])),
        Geometry::LineString(line) => paths.push(line.clone()),
        Geometry::MultiLineString(lines) => paths.extend(lines.0.iter().cloned()),
        Geometry::Polygon(polygon) => extract_polygon(polygon, paths),
        Geometry::MultiPolygon(polygons) => {
            for polygon in &polygons.0 {
                extract_polygon(polygon, paths);
            }
        }
        Geometry::GeometryCollection(collection) => {
            for member in &collection.0 {
                extract_into(member, paths)?;
            }
        }
        Geometry::Point(_) => return Err(ComposeError::UnsupportedGeometry("Point")),
        Geometry::MultiPoint(_) => return Err(ComposeError::UnsupportedGeometry("MultiPoint")),
        Geometry::Rect(_) => return Err(ComposeError::UnsupportedGeometry("Rect")),
        Geometry::Triangle(_) => return Err(ComposeError::UnsupportedGeometry("Triangle")),
    }
    Ok(())
}

fn extract_polygon(polygon: &Polygon<f64>, paths: &mut Vec<LineString<f64>>) {
    paths.push(polygon.exterior().clone());
    paths.extend(polygon.interiors().iter().cloned());
}

/// The three nested page-frame rectangles: full size, and insets of 5 and
/// 10 millimeters (projected units are kilometers)
pub fn page_frames(width: f64, height: f64) -> Vec<LineString<f64>> {
    [0.0, 5.0 / 1000.0, 10.0 / 1000.0]
        .iter()
        .map(|inset| frame(width - inset, height - inset))
        .collect()
}

/// A closed rectangle centered on the origin
fn frame(width: f64, height: f64) -> LineString<f64> {
    let (w, h) = (width / 2.0, height / 2.0);
    LineString::from(vec![(-w, -h), (w, -h), (w, h), (-w, h), (-w, -h)])
}
