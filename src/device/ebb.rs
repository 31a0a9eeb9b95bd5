//! EBB (EiBotBoard) serial driver
//!
//! Drives an AxiDraw-style plotter with plain EBB commands over a serial
//! port: `EM` for motor power, `SP` for the pen servo, `XM` for mixed-axis
//! moves, `CS` to clear the step counters. Motion planning (acceleration
//! profiles) is deliberately not modeled; every move runs at a constant rate.

use crate::device::{Device, DeviceError, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

const BAUD_RATE: u32 = 9600;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Motor steps per drawing unit (inches, at 8x microstepping)
const STEPS_PER_UNIT: f64 = 2032.0;

/// Constant travel rate, in steps per second
const STEPS_PER_SECOND: f64 = 4000.0;

/// Servo settle delay after a pen transition, in milliseconds
const PEN_DELAY_MS: u64 = 300;

/// A plotter speaking the EBB protocol over a serial port.
///
/// Tracks the logical head position so `goto` and `home` can issue relative
/// moves; `zero_position` resets both the logical position and the board's
/// step counters.
pub struct EbbDevice {
    port: Box<dyn SerialPort>,
    x: f64,
    y: f64,
}

impl EbbDevice {
    /// Open the plotter on the given serial port
    pub fn open(path: &str) -> Result<Self> {
        tracing::debug!("opening plotter on {path}");
        let port = serialport::new(path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(Self { port, x: 0.0, y: 0.0 })
    }

    /// Send one command and wait for the board's acknowledgement
    fn command(&mut self, command: &str) -> Result<()> {
        tracing::trace!("ebb command: {command}");
        self.port.write_all(command.as_bytes())?;
        self.port.write_all(b"\r")?;
        self.port.flush()?;
        let response = self.read_line()?;
        if response != "OK" {
            return Err(DeviceError::UnexpectedResponse(response));
        }
        Ok(())
    }

    /// Read one CR/LF-terminated response line
    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            self.port.read_exact(&mut byte)?;
            match byte[0] {
                b'\n' => break,
                b'\r' => {}
                other => line.push(other),
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

/// EBB `XM` command for a relative move, or None when the offset rounds to
/// zero steps
fn motion_command(dx: f64, dy: f64) -> Option<String> {
    let sx = (dx * STEPS_PER_UNIT).round() as i64;
    let sy = (dy * STEPS_PER_UNIT).round() as i64;
    if sx == 0 && sy == 0 {
        return None;
    }
    let distance = ((sx * sx + sy * sy) as f64).sqrt();
    let duration_ms = ((distance / STEPS_PER_SECOND) * 1000.0).max(1.0).round() as i64;
    Some(format!("XM,{duration_ms},{sx},{sy}"))
}

impl Device for EbbDevice {
    fn zero_position(&mut self) -> Result<()> {
        self.x = 0.0;
        self.y = 0.0;
        self.command("CS")
    }

    fn home(&mut self) -> Result<()> {
        self.goto(0.0, 0.0)
    }

    fn pen_up(&mut self) -> Result<()> {
        self.command(&format!("SP,1,{PEN_DELAY_MS}"))
    }

    fn pen_down(&mut self) -> Result<()> {
        self.command(&format!("SP,0,{PEN_DELAY_MS}"))
    }

    fn enable_motors(&mut self) -> Result<()> {
        self.command("EM,1,1")
    }

    fn disable_motors(&mut self) -> Result<()> {
        self.command("EM,0,0")
    }

    fn move_by(&mut self, dx: f64, dy: f64) -> Result<()> {
        if let Some(command) = motion_command(dx, dy) {
            self.command(&command)?;
        }
        self.x += dx;
        self.y += dy;
        Ok(())
    }

    fn goto(&mut self, x: f64, y: f64) -> Result<()> {
        self.move_by(x - self.x, y - self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_command_format() {
        let command = motion_command(1.0, 0.0).unwrap();
        // 2032 steps at 4000 steps/s is a 508 ms move
        assert_eq!(command, "XM,508,2032,0");
    }

    #[test]
    fn test_motion_command_negative_offsets() {
        let command = motion_command(-0.5, 0.25).unwrap();
        assert_eq!(command, "XM,284,-1016,508");
    }

    #[test]
    fn test_zero_motion_is_skipped() {
        assert!(motion_command(0.0, 0.0).is_none());
        // Sub-step offsets round away to nothing
        assert!(motion_command(1e-6, -1e-6).is_none());
    }
}
