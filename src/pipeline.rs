//! Plotting pipeline orchestrator
//!
//! Runs one drawing through the strictly ordered stages: fit-to-page, path
//! ordering, optional join/simplify, optional export, optional render, and an
//! optional physical session (calibration and/or drawing) on the plotter.

use crate::device::{self, CalibrationOutcome, Device, DeviceError, DeviceSession, calibrate};
use crate::drawing::{DEFAULT_PIXELS_PER_UNIT, Drawing, DrawingError};
use std::io::BufRead;
use std::path::PathBuf;

/// Error types for the pipeline module
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Drawing(#[from] DrawingError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline configuration; mirrors the composable plot flag set
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// Export the transformed drawing to this file
    pub output: Option<PathBuf>,
    /// Render the transformed drawing as an image to this path
    pub render: Option<PathBuf>,
    /// Open the rendered image in an image viewer
    pub show: bool,
    /// Draw the result on the plotter
    pub draw: bool,
    /// Page width, in drawing units
    pub width: f64,
    /// Page height, in drawing units
    pub height: f64,
    /// Join/simplify threshold; negative disables both stages entirely
    pub simplify: f64,
    /// Trace the drawing's bounding box before drawing
    pub calibrate: bool,
    /// Report per-path progress while drawing
    pub progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output: None,
            render: None,
            show: false,
            draw: false,
            width: 12.0,
            height: 8.5,
            simplify: 0.002,
            calibrate: false,
            progress: true,
        }
    }
}

/// How a pipeline invocation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    /// The operator quit during calibration; the session is already closed
    /// and the process should exit with success status
    OperatorQuit,
}

/// Offline stages: fit-to-page, path ordering, and join/simplify when the
/// threshold is non-negative (a negative threshold disables both, unlike
/// zero, which still runs them with zero tolerance)
pub fn prepare(drawing: &Drawing, options: &PipelineOptions) -> Drawing {
    let drawing = drawing.rotate_and_scale_to_fit(options.width, options.height, 90.0);
    let drawing = drawing.sort_paths();
    if options.simplify >= 0.0 {
        drawing
            .join_paths(options.simplify)
            .simplify_paths(options.simplify)
    } else {
        drawing
    }
}

/// Run the full pipeline over one drawing.
///
/// `open_device` is only invoked when a physical session is requested, and at
/// most once per invocation; `input` feeds the interactive calibration
/// prompt.
pub fn run<D, F>(
    drawing: &Drawing,
    options: &PipelineOptions,
    open_device: F,
    input: &mut dyn BufRead,
) -> Result<PipelineOutcome>
where
    D: Device,
    F: FnOnce() -> device::Result<D>,
{
    let drawing = prepare(drawing, options);
    tracing::info!(
        "pipeline drawing: {} paths, {} points",
        drawing.path_count(),
        drawing.point_count()
    );

    if let Some(path) = &options.output {
        drawing.dump(path)?;
        tracing::info!("exported drawing to {}", path.display());
    }

    if let Some(path) = &options.render {
        let image = drawing.render(DEFAULT_PIXELS_PER_UNIT);
        image.save(path).map_err(DrawingError::from)?;
        tracing::info!("rendered drawing to {}", path.display());
        if options.show {
            let status = std::process::Command::new("eog").arg(path).status()?;
            viewer_status(status)?;
        }
    }

    if options.calibrate || options.draw {
        let mut device = open_device()?;
        let mut session = DeviceSession::open(&mut device)?;

        if options.calibrate {
            if let Some(bounds) = drawing.bounds() {
                if calibrate(session.device(), bounds, input)? == CalibrationOutcome::Quit {
                    session.close()?;
                    return Ok(PipelineOutcome::OperatorQuit);
                }
            } else {
                tracing::warn!("empty drawing, skipping calibration");
            }
        }

        if options.draw {
            session.device().run_drawing(&drawing, options.progress)?;
        }

        session.close()?;
    }

    Ok(PipelineOutcome::Completed)
}

/// A viewer that exits non-zero is a pipeline failure
fn viewer_status(status: std::process::ExitStatus) -> std::io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "image viewer exited with {status}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Device whose call log outlives the pipeline's ownership of it
    #[derive(Clone, Default)]
    struct SharedMock {
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl SharedMock {
        fn count(&self, name: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| **call == name)
                .count()
        }

        fn record(&mut self, name: &'static str) -> device::Result<()> {
            self.calls.borrow_mut().push(name);
            Ok(())
        }
    }

    impl Device for SharedMock {
        fn zero_position(&mut self) -> device::Result<()> {
            self.record("zero_position")
        }
        fn home(&mut self) -> device::Result<()> {
            self.record("home")
        }
        fn pen_up(&mut self) -> device::Result<()> {
            self.record("pen_up")
        }
        fn pen_down(&mut self) -> device::Result<()> {
            self.record("pen_down")
        }
        fn enable_motors(&mut self) -> device::Result<()> {
            self.record("enable_motors")
        }
        fn disable_motors(&mut self) -> device::Result<()> {
            self.record("disable_motors")
        }
        fn move_by(&mut self, _dx: f64, _dy: f64) -> device::Result<()> {
            self.record("move")
        }
        fn goto(&mut self, _x: f64, _y: f64) -> device::Result<()> {
            self.record("goto")
        }
    }

    fn create_test_drawing() -> Drawing {
        Drawing::new(vec![
            LineString::from(vec![(0.0, 0.0), (1.0, 0.5)]),
            LineString::from(vec![(2.0, 2.0), (3.0, 2.5), (4.0, 2.0)]),
        ])
    }

    fn offline_options() -> PipelineOptions {
        PipelineOptions::default()
    }

    #[test]
    fn test_offline_run_never_opens_device() {
        let drawing = create_test_drawing();
        let mut input = Cursor::new("");
        let outcome = run(
            &drawing,
            &offline_options(),
            || -> device::Result<SharedMock> { panic!("device must not be opened") },
            &mut input,
        )
        .unwrap();
        assert_eq!(outcome, PipelineOutcome::Completed);
    }

    #[test]
    fn test_negative_simplify_disables_join_and_simplify() {
        // Collinear interior points and touching endpoints that joining and
        // simplification would otherwise remove
        let drawing = Drawing::new(vec![
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            LineString::from(vec![(2.0, 0.0), (3.0, 0.0)]),
        ]);
        let sorted = drawing
            .rotate_and_scale_to_fit(12.0, 8.5, 90.0)
            .sort_paths();

        let mut options = offline_options();
        options.simplify = -1.0;
        let prepared = prepare(&drawing, &options);

        // Output equals the sorted, un-joined, un-simplified input
        assert_eq!(prepared.path_count(), sorted.path_count());
        assert_eq!(prepared.point_count(), sorted.point_count());
        assert_eq!(prepared.point_count(), 5);

        // Threshold 0 still runs both algorithms, unlike a negative threshold
        options.simplify = 0.0;
        let zeroed = prepare(&drawing, &options);
        assert_eq!(zeroed.path_count(), 1);
        assert!(zeroed.point_count() < 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_viewer_exit_is_an_error() {
        use std::os::unix::process::ExitStatusExt;
        assert!(viewer_status(std::process::ExitStatus::from_raw(0)).is_ok());
        // Raw wait status 256 is exit code 1
        assert!(viewer_status(std::process::ExitStatus::from_raw(256)).is_err());
    }

    #[test]
    fn test_draw_opens_one_bracketed_session() {
        let drawing = create_test_drawing();
        let mock = SharedMock::default();
        let handle = mock.clone();

        let mut options = offline_options();
        options.draw = true;
        options.progress = false;
        let mut input = Cursor::new("");
        let outcome = run(&drawing, &options, || Ok(mock), &mut input).unwrap();

        assert_eq!(outcome, PipelineOutcome::Completed);
        assert_eq!(handle.count("enable_motors"), 1);
        assert_eq!(handle.count("disable_motors"), 1);
        assert_eq!(handle.count("pen_down"), 2);
    }

    #[test]
    fn test_calibrate_quit_closes_session_and_reports() {
        let drawing = create_test_drawing();
        let mock = SharedMock::default();
        let handle = mock.clone();

        let mut options = offline_options();
        options.calibrate = true;
        options.draw = true;
        let mut input = Cursor::new("q\n");
        let outcome = run(&drawing, &options, || Ok(mock), &mut input).unwrap();

        assert_eq!(outcome, PipelineOutcome::OperatorQuit);
        assert_eq!(handle.count("disable_motors"), 1);
        // Quit aborts before the drawing stage
        assert_eq!(handle.count("pen_down"), 0);
    }

    #[test]
    fn test_calibrate_then_draw_in_one_session() {
        let drawing = create_test_drawing();
        let mock = SharedMock::default();
        let handle = mock.clone();

        let mut options = offline_options();
        options.calibrate = true;
        options.draw = true;
        options.progress = false;
        let mut input = Cursor::new("n\n");
        let outcome = run(&drawing, &options, || Ok(mock), &mut input).unwrap();

        assert_eq!(outcome, PipelineOutcome::Completed);
        assert_eq!(handle.count("enable_motors"), 1);
        assert_eq!(handle.count("disable_motors"), 1);
        assert!(handle.count("pen_down") > 0);
    }
}
