//! Plotter device contract, session bracketing, and calibration
//!
//! [`Device`] is the motion contract the pipeline draws through; [`EbbDevice`]
//! implements it over a serial port. [`DeviceSession`] brackets motor-enabled
//! work so the motors are disabled on every exit path.

mod ebb;
mod session;

pub use ebb::EbbDevice;
pub use session::{CalibrationOutcome, DeviceSession, calibrate};

use crate::drawing::Drawing;
use geo::LineString;

/// Error types for the device module
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected response from device: {0:?}")]
    UnexpectedResponse(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Motion contract of the physical plotter.
///
/// Any failure is fatal to the current session; retries are not modeled.
pub trait Device {
    /// Declare the current head position to be (0, 0)
    fn zero_position(&mut self) -> Result<()>;

    /// Travel back to (0, 0)
    fn home(&mut self) -> Result<()>;

    fn pen_up(&mut self) -> Result<()>;

    fn pen_down(&mut self) -> Result<()>;

    /// Must precede any movement
    fn enable_motors(&mut self) -> Result<()>;

    fn disable_motors(&mut self) -> Result<()>;

    /// Move the head by a relative offset, in drawing units
    fn move_by(&mut self, dx: f64, dy: f64) -> Result<()>;

    /// Move the head to an absolute position, in drawing units
    fn goto(&mut self, x: f64, y: f64) -> Result<()>;

    /// Follow a path vertex by vertex without touching pen state
    fn run_path(&mut self, path: &LineString<f64>) -> Result<()> {
        for coord in &path.0 {
            self.goto(coord.x, coord.y)?;
        }
        Ok(())
    }

    /// Draw every path in order: pen up, travel to the path start, pen down,
    /// follow the path; the pen ends raised.
    fn run_drawing(&mut self, drawing: &Drawing, progress: bool) -> Result<()> {
        let total = drawing.path_count();
        for (index, path) in drawing.paths().iter().enumerate() {
            if progress {
                tracing::info!("drawing path {}/{}", index + 1, total);
            }
            let Some(start) = path.0.first() else {
                continue;
            };
            self.pen_up()?;
            self.goto(start.x, start.y)?;
            self.pen_down()?;
            self.run_path(path)?;
        }
        self.pen_up()?;
        Ok(())
    }
}
