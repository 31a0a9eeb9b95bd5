//! Drawing transforms: fit-to-page, path ordering, joining, simplification

use crate::drawing::Drawing;
use geo::{AffineOps, AffineTransform, Coord, LineString, Simplify};

impl Drawing {
    /// Uniformly scale, rotating by multiples of `step` degrees, so the
    /// drawing's bounding box fills as much of `width`×`height` as possible
    /// while preserving aspect ratio. The result is centered on the page with
    /// its top-left at positive coordinates.
    pub fn rotate_and_scale_to_fit(&self, width: f64, height: f64, step: f64) -> Drawing {
        let Some(bounds) = self.bounds() else {
            return self.clone();
        };
        let origin = bounds.center();

        let mut best_scale = f64::NEG_INFINITY;
        let mut best_angle = 0.0;
        let mut angle = 0.0;
        loop {
            let rotated = self.affine(&AffineTransform::rotate(angle, origin));
            if let Some(rotated_bounds) = rotated.bounds() {
                let scale = fit_scale(
                    width,
                    height,
                    rotated_bounds.width(),
                    rotated_bounds.height(),
                );
                if scale > best_scale {
                    best_scale = scale;
                    best_angle = angle;
                }
            }
            angle += step;
            if step <= 0.0 || angle >= 360.0 {
                break;
            }
        }

        let fitted = self
            .affine(&AffineTransform::rotate(best_angle, origin))
            .affine(&AffineTransform::scale(best_scale, best_scale, origin));

        // Center the scaled bounding box on the page
        let Some(fitted_bounds) = fitted.bounds() else {
            return fitted;
        };
        let tx = (width - fitted_bounds.width()) / 2.0 - fitted_bounds.min().x;
        let ty = (height - fitted_bounds.height()) / 2.0 - fitted_bounds.min().y;
        fitted.affine(&AffineTransform::translate(tx, ty))
    }

    /// Reorder paths to reduce pen-up travel: repeatedly pick the path whose
    /// nearest endpoint is closest to the current pen position, reversing it
    /// when its end is the nearer endpoint. The output is a permutation of the
    /// input up to path reversal.
    pub fn sort_paths(&self) -> Drawing {
        let mut remaining: Vec<LineString<f64>> = self.paths().to_vec();
        let mut sorted = Vec::with_capacity(remaining.len());
        let mut position = Coord { x: 0.0, y: 0.0 };

        while !remaining.is_empty() {
            let mut best_index = 0;
            let mut best_distance = f64::INFINITY;
            let mut best_reversed = false;
            for (index, path) in remaining.iter().enumerate() {
                let start = distance(position, path.0[0]);
                let end = distance(position, path.0[path.0.len() - 1]);
                if start < best_distance {
                    best_distance = start;
                    best_index = index;
                    best_reversed = false;
                }
                if end < best_distance {
                    best_distance = end;
                    best_index = index;
                    best_reversed = true;
                }
            }

            let mut path = remaining.swap_remove(best_index);
            if best_reversed {
                path.0.reverse();
            }
            position = path.0[path.0.len() - 1];
            sorted.push(path);
        }

        Drawing::new(sorted)
    }

    /// Merge adjacent paths whose endpoints lie within `threshold` of each
    /// other into single paths
    pub fn join_paths(&self, threshold: f64) -> Drawing {
        let mut joined: Vec<LineString<f64>> = Vec::new();
        for path in self.paths() {
            match joined.last_mut() {
                Some(last) if distance(last.0[last.0.len() - 1], path.0[0]) <= threshold => {
                    last.0.extend_from_slice(&path.0);
                }
                _ => joined.push(path.clone()),
            }
        }
        Drawing::new(joined)
    }

    /// Reduce each path's interior points with Douglas-Peucker at `threshold`
    pub fn simplify_paths(&self, threshold: f64) -> Drawing {
        Drawing::new(
            self.paths()
                .iter()
                .map(|path| path.simplify(threshold))
                .collect(),
        )
    }

    fn affine(&self, transform: &AffineTransform<f64>) -> Drawing {
        Drawing::new(
            self.paths()
                .iter()
                .map(|path| path.affine_transform(transform))
                .collect(),
        )
    }
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Largest uniform scale that fits a `bw`×`bh` box into `width`×`height`
fn fit_scale(width: f64, height: f64, bw: f64, bh: f64) -> f64 {
    match (bw > 0.0, bh > 0.0) {
        (true, true) => (width / bw).min(height / bh),
        (true, false) => width / bw,
        (false, true) => height / bh,
        (false, false) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(points: &[(f64, f64)]) -> LineString<f64> {
        LineString::from(points.to_vec())
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_fit_fills_page_within_bounds() {
        let drawing = Drawing::new(vec![path(&[(0.0, 0.0), (4.0, 2.0)])]);
        let fitted = drawing.rotate_and_scale_to_fit(12.0, 8.5, 90.0);

        let bounds = fitted.bounds().unwrap();
        assert!(bounds.width() <= 12.0 + 1e-9);
        assert!(bounds.height() <= 8.5 + 1e-9);
        // The wide box fits unrotated, limited by width
        assert_close(bounds.width(), 12.0);
    }

    #[test]
    fn test_fit_prefers_rotation_when_larger() {
        // A tall drawing on a wide page should be rotated 90 degrees
        let drawing = Drawing::new(vec![path(&[(0.0, 0.0), (1.0, 10.0)])]);
        let fitted = drawing.rotate_and_scale_to_fit(12.0, 8.5, 90.0);

        let bounds = fitted.bounds().unwrap();
        assert!(bounds.width() > bounds.height());
        assert!(bounds.width() <= 12.0 + 1e-9);
        assert!(bounds.height() <= 8.5 + 1e-9);
    }

    #[test]
    fn test_fit_centers_on_page() {
        let drawing = Drawing::new(vec![path(&[(5.0, 5.0), (6.0, 5.5)])]);
        let fitted = drawing.rotate_and_scale_to_fit(12.0, 8.5, 90.0);

        let center = fitted.bounds().unwrap().center();
        assert_close(center.x, 6.0);
        assert_close(center.y, 4.25);
    }

    #[test]
    fn test_sort_paths_is_permutation() {
        let drawing = Drawing::new(vec![
            path(&[(9.0, 9.0), (10.0, 10.0)]),
            path(&[(0.0, 0.0), (1.0, 1.0)]),
            path(&[(5.0, 5.0), (4.0, 4.0)]),
        ]);
        let sorted = drawing.sort_paths();

        assert_eq!(sorted.path_count(), 3);
        assert_eq!(sorted.point_count(), drawing.point_count());
        // Nearest to the origin comes first
        assert_eq!(sorted.paths()[0].0[0], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_sort_paths_reverses_when_end_is_nearer() {
        let drawing = Drawing::new(vec![path(&[(10.0, 0.0), (0.5, 0.0)])]);
        let sorted = drawing.sort_paths();
        assert_eq!(sorted.paths()[0].0[0], Coord { x: 0.5, y: 0.0 });
    }

    #[test]
    fn test_join_paths_merges_within_threshold() {
        let drawing = Drawing::new(vec![
            path(&[(0.0, 0.0), (1.0, 0.0)]),
            path(&[(1.0005, 0.0), (2.0, 0.0)]),
            path(&[(5.0, 5.0), (6.0, 5.0)]),
        ]);
        let joined = drawing.join_paths(0.002);

        assert_eq!(joined.path_count(), 2);
        assert_eq!(joined.paths()[0].0.len(), 4);
    }

    #[test]
    fn test_join_paths_zero_threshold_requires_exact_match() {
        let drawing = Drawing::new(vec![
            path(&[(0.0, 0.0), (1.0, 0.0)]),
            path(&[(1.0, 0.0), (2.0, 0.0)]),
            path(&[(2.5, 0.0), (3.0, 0.0)]),
        ]);
        let joined = drawing.join_paths(0.0);
        assert_eq!(joined.path_count(), 2);
    }

    #[test]
    fn test_simplify_removes_collinear_interior_points() {
        let drawing = Drawing::new(vec![path(&[
            (0.0, 0.0),
            (1.0, 0.0001),
            (2.0, 0.0),
            (3.0, 0.0001),
            (4.0, 0.0),
        ])]);
        let simplified = drawing.simplify_paths(0.01);

        assert_eq!(simplified.path_count(), 1);
        assert_eq!(simplified.paths()[0].0.len(), 2);
        // Endpoints survive simplification
        assert_eq!(simplified.paths()[0].0[0], Coord { x: 0.0, y: 0.0 });
        assert_eq!(simplified.paths()[0].0[1], Coord { x: 4.0, y: 0.0 });
    }
}
