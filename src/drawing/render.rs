//! CPU rasterization of drawings to grayscale images

use crate::drawing::Drawing;
use image::{GrayImage, Luma};

/// Default raster resolution, in pixels per drawing unit
pub const DEFAULT_PIXELS_PER_UNIT: f64 = 109.0;

/// Blank margin around the rendered drawing, in pixels
const MARGIN_PX: f64 = 8.0;

impl Drawing {
    /// Rasterize the drawing onto a white canvas at the given resolution,
    /// drawing each path as an anti-aliased black polyline.
    pub fn render(&self, pixels_per_unit: f64) -> GrayImage {
        let Some(bounds) = self.bounds() else {
            return GrayImage::from_pixel(1, 1, Luma([255]));
        };

        let width = (bounds.width() * pixels_per_unit + 2.0 * MARGIN_PX).ceil() as u32;
        let height = (bounds.height() * pixels_per_unit + 2.0 * MARGIN_PX).ceil() as u32;
        let mut image = GrayImage::from_pixel(width.max(1), height.max(1), Luma([255]));

        for path in self.paths() {
            for segment in path.0.windows(2) {
                let x0 = (segment[0].x - bounds.min().x) * pixels_per_unit + MARGIN_PX;
                let y0 = (segment[0].y - bounds.min().y) * pixels_per_unit + MARGIN_PX;
                let x1 = (segment[1].x - bounds.min().x) * pixels_per_unit + MARGIN_PX;
                let y1 = (segment[1].y - bounds.min().y) * pixels_per_unit + MARGIN_PX;
                draw_line(&mut image, x0, y0, x1, y1);
            }
        }

        image
    }
}

/// Darken one pixel by `alpha` in [0, 1], ignoring out-of-canvas coordinates
fn plot(image: &mut GrayImage, x: i64, y: i64, alpha: f64) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    let value = pixel.0[0] as f64 * (1.0 - alpha);
    pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
}

/// Xiaolin Wu anti-aliased line
fn draw_line(image: &mut GrayImage, mut x0: f64, mut y0: f64, mut x1: f64, mut y1: f64) {
    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let gradient = if dx == 0.0 { 1.0 } else { (y1 - y0) / dx };

    let plot_point = |image: &mut GrayImage, x: i64, y: i64, alpha: f64| {
        if steep {
            plot(image, y, x, alpha);
        } else {
            plot(image, x, y, alpha);
        }
    };

    // First endpoint
    let x_end = x0.round();
    let y_end = y0 + gradient * (x_end - x0);
    let x_gap = 1.0 - (x0 + 0.5).fract();
    let x_px0 = x_end as i64;
    plot_point(image, x_px0, y_end.floor() as i64, (1.0 - y_end.fract()) * x_gap);
    plot_point(image, x_px0, y_end.floor() as i64 + 1, y_end.fract() * x_gap);
    let mut intery = y_end + gradient;

    // Second endpoint
    let x_end = x1.round();
    let y_end = y1 + gradient * (x_end - x1);
    let x_gap = (x1 + 0.5).fract();
    let x_px1 = x_end as i64;
    plot_point(image, x_px1, y_end.floor() as i64, (1.0 - y_end.fract()) * x_gap);
    plot_point(image, x_px1, y_end.floor() as i64 + 1, y_end.fract() * x_gap);

    for x in (x_px0 + 1)..x_px1 {
        plot_point(image, x, intery.floor() as i64, 1.0 - intery.fract());
        plot_point(image, x, intery.floor() as i64 + 1, intery.fract());
        intery += gradient;
    }
}
