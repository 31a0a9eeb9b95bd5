//! Motor-enabled session bracketing and interactive calibration

use crate::device::{Device, Result};
use geo::{LineString, Rect};
use std::io::{BufRead, Write};

/// Exclusive ownership of the plotter for motor-enabled work.
///
/// Opening the session enables the motors; they are guaranteed to be disabled
/// again on every exit path. Prefer [`DeviceSession::close`] so disable
/// failures surface as errors; `Drop` is the backstop for panics and early
/// returns, logging instead of propagating.
pub struct DeviceSession<'a> {
    device: &'a mut dyn Device,
    disabled: bool,
}

impl<'a> DeviceSession<'a> {
    /// Enable the motors and take ownership of the device for the session
    pub fn open(device: &'a mut dyn Device) -> Result<Self> {
        device.enable_motors()?;
        Ok(Self {
            device,
            disabled: false,
        })
    }

    pub fn device(&mut self) -> &mut dyn Device {
        self.device
    }

    /// Disable the motors and end the session
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.disabled {
            return Ok(());
        }
        self.disabled = true;
        self.device.disable_motors()
    }
}

impl Drop for DeviceSession<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            tracing::error!("failed to disable motors: {error}");
        }
    }
}

/// Operator decision ending a calibration loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationOutcome {
    /// Operator declined to continue; control returns to the caller
    Stopped,
    /// Operator asked to quit; the caller must close the session and
    /// terminate with success status
    Quit,
}

/// Trace the bounding rectangle's perimeter, pen up, as two L-shaped halves,
/// prompting the operator after each trace: `y` repeats the cycle, `q`
/// requests termination, anything else stops calibration.
pub fn calibrate(
    device: &mut dyn Device,
    bounds: Rect<f64>,
    input: &mut dyn BufRead,
) -> Result<CalibrationOutcome> {
    let (min, max) = (bounds.min(), bounds.max());
    let traces = [
        LineString::from(vec![(min.x, min.y), (max.x, min.y), (max.x, max.y)]),
        LineString::from(vec![(max.x, max.y), (min.x, max.y), (min.x, min.y)]),
    ];

    device.pen_up()?;
    loop {
        for trace in &traces {
            device.run_path(trace)?;
            print!("Continue? [y/n/q] ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            input.read_line(&mut line)?;
            match line.trim().to_lowercase().as_str() {
                "q" => return Ok(CalibrationOutcome::Quit),
                "y" => {}
                _ => return Ok(CalibrationOutcome::Stopped),
            }
        }
    }
}
