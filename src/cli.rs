//! Command-line surface

use crate::pipeline::PipelineOptions;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// roadplot - compose OpenStreetMap drawings and drive an EBB pen plotter
pub struct Cli {
    /// Serial port of the plotter
    #[arg(long, global = true, default_value = "/dev/ttyACM0")]
    pub port: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draw a saved drawing file
    Draw {
        /// Drawing file to draw
        file: PathBuf,
    },
    /// Render a saved drawing file to an image
    Render {
        /// Drawing file to render
        file: PathBuf,
        /// Output file name
        #[arg(short, long, default_value = "out.png")]
        output: PathBuf,
    },
    /// Move the head by a relative offset, in drawing units
    Move {
        #[arg(allow_hyphen_values = true)]
        dx: f64,
        #[arg(allow_hyphen_values = true)]
        dy: f64,
    },
    /// Move the head to an absolute coordinate, in drawing units
    Goto {
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
    },
    /// Set the current position to (0, 0)
    Zero,
    /// Move to (0, 0)
    Home,
    /// Move the pen to the up position
    Up,
    /// Move the pen to the down position
    Down,
    /// Turn the motors on
    On,
    /// Turn the motors off
    Off,
    /// Compose a drawing from an .osm map file and run the plotting pipeline
    Map(MapArgs),
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// .osm map file to read from
    pub osm_file: PathBuf,

    /// Latitude of the map center, in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the map center, in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Width of the mapped area, in kilometers
    #[arg(long, default_value_t = 3.22)]
    pub map_width_km: f64,

    /// Width of one road lane, in meters
    #[arg(long, default_value_t = 3.7)]
    pub lane_width_m: f64,

    #[command(flatten)]
    pub plot: PlotArgs,
}

/// Composable flag set shared by pipeline-driven invocations
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Export the drawing to this file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Render the drawing as an image to this path
    #[arg(short = 'r', long)]
    pub render: Option<PathBuf>,

    /// Show the rendered image in an image viewer
    #[arg(short = 'S', long)]
    pub show: bool,

    /// Draw the result on the plotter
    #[arg(short = 'd', long)]
    pub draw: bool,

    /// Width of the output page, in inches
    #[arg(short = 'W', long, default_value_t = 12.0)]
    pub width: f64,

    /// Height of the output page, in inches
    #[arg(short = 'H', long, default_value_t = 8.5)]
    pub height: f64,

    /// Join and simplify paths with this threshold, negative to disable
    #[arg(short = 's', long, default_value_t = 0.002, allow_hyphen_values = true)]
    pub simplify: f64,

    /// Outline the bounding box first to center the canvas
    #[arg(short = 'c', long)]
    pub calibrate: bool,

    /// Disable progress reporting while drawing
    #[arg(short = 'P', long)]
    pub no_progress: bool,
}

impl PlotArgs {
    pub fn to_options(&self) -> PipelineOptions {
        PipelineOptions {
            output: self.output.clone(),
            render: self.render.clone(),
            show: self.show,
            draw: self.draw,
            width: self.width,
            height: self.height,
            simplify: self.simplify,
            calibrate: self.calibrate,
            progress: !self.no_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_subcommand_flags() {
        let cli = Cli::try_parse_from([
            "roadplot", "map", "boston.osm", "--lat", "42.0", "--lng", "-71.0", "-r",
            "out.png", "-s", "-1", "-c", "-P",
        ])
        .unwrap();

        let Command::Map(args) = cli.command else {
            panic!("expected map subcommand");
        };
        assert_eq!(args.lat, 42.0);
        assert_eq!(args.lng, -71.0);
        let options = args.plot.to_options();
        assert_eq!(options.render, Some(PathBuf::from("out.png")));
        assert_eq!(options.simplify, -1.0);
        assert!(options.calibrate);
        assert!(!options.progress);
        assert_eq!(options.width, 12.0);
    }

    #[test]
    fn test_device_subcommands() {
        let cli = Cli::try_parse_from(["roadplot", "move", "--", "-1.5", "0.5"]).unwrap();
        let Command::Move { dx, dy } = cli.command else {
            panic!("expected move subcommand");
        };
        assert_eq!((dx, dy), (-1.5, 0.5));

        let cli = Cli::try_parse_from(["roadplot", "--port", "/dev/ttyUSB1", "on"]).unwrap();
        assert_eq!(cli.port, "/dev/ttyUSB1");
        assert!(matches!(cli.command, Command::On));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["roadplot", "frobnicate"]).is_err());
        assert!(Cli::try_parse_from(["roadplot"]).is_err());
    }
}
