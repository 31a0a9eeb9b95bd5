//! Plottable drawings: ordered collections of polyline paths
//!
//! A [`Drawing`] is the unit passed through the plotting pipeline, the
//! renderer, and the device. Every transform returns a new value; nothing is
//! mutated in place.

mod render;
mod transform;

pub use render::DEFAULT_PIXELS_PER_UNIT;

use geo::{Coord, LineString, Rect};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Error types for the drawing module
#[derive(Debug, thiserror::Error)]
pub enum DrawingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, DrawingError>;

/// An ordered sequence of paths to be drawn.
///
/// Construction drops degenerate paths, so every stored path has at least two
/// points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    paths: Vec<LineString<f64>>,
}

impl Drawing {
    /// Build a drawing, excluding single-point and empty paths
    pub fn new(paths: Vec<LineString<f64>>) -> Self {
        Self {
            paths: paths
                .into_iter()
                .filter(|path| path.0.len() >= 2)
                .collect(),
        }
    }

    pub fn paths(&self) -> &[LineString<f64>] {
        &self.paths
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn point_count(&self) -> usize {
        self.paths.iter().map(|path| path.0.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Axis-aligned bounding box over every path point
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut found = false;

        for path in &self.paths {
            for coord in &path.0 {
                min_x = min_x.min(coord.x);
                min_y = min_y.min(coord.y);
                max_x = max_x.max(coord.x);
                max_y = max_y.max(coord.y);
                found = true;
            }
        }

        found.then(|| {
            Rect::new(
                Coord { x: min_x, y: min_y },
                Coord { x: max_x, y: max_y },
            )
        })
    }

    /// Persist the drawing as JSON
    pub fn dump(&self, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    /// Load a drawing persisted by [`Drawing::dump`]
    pub fn load(path: &Path) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        let drawing: Drawing = serde_json::from_reader(file)?;
        // Re-apply the degenerate-path guarantee to untrusted input
        Ok(Drawing::new(drawing.paths))
    }
}
