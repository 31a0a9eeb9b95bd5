use clap::Parser;
use roadplot::cli::{Cli, Command, MapArgs};
use roadplot::compose::{self, ComposeOptions};
use roadplot::device::{Device, DeviceSession, EbbDevice};
use roadplot::drawing::{DEFAULT_PIXELS_PER_UNIT, Drawing};
use roadplot::osm::{self, RoadMap};
use roadplot::pipeline::{self, PipelineOutcome};
use roadplot::projection::AzimuthalEqualArea;

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run(Cli::parse()) {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Render { file, output } => {
            let drawing = Drawing::load(&file)?.rotate_and_scale_to_fit(12.0, 8.5, 90.0);
            drawing.render(DEFAULT_PIXELS_PER_UNIT).save(&output)?;
            tracing::info!("rendered {} paths to {}", drawing.path_count(), output.display());
        }
        Command::Draw { file } => {
            let drawing = Drawing::load(&file)?;
            let mut device = EbbDevice::open(&cli.port)?;
            let mut session = DeviceSession::open(&mut device)?;
            session.device().run_drawing(&drawing, true)?;
            session.close()?;
        }
        Command::Map(args) => run_map(&cli.port, args)?,
        other => {
            let mut device = EbbDevice::open(&cli.port)?;
            match other {
                Command::Move { dx, dy } => device.move_by(dx, dy)?,
                Command::Goto { x, y } => device.goto(x, y)?,
                Command::Zero => device.zero_position()?,
                Command::Home => device.home()?,
                Command::Up => device.pen_up()?,
                Command::Down => device.pen_down()?,
                Command::On => device.enable_motors()?,
                Command::Off => device.disable_motors()?,
                Command::Render { .. } | Command::Draw { .. } | Command::Map(_) => unreachable!(),
            }
        }
    }
    Ok(())
}

fn run_map(port: &str, args: MapArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut map = RoadMap::new();
    osm::parse_file(&args.osm_file, &mut map)?;
    tracing::info!(
        "parsed {}: {} classes, {} ways, {} nodes",
        args.osm_file.display(),
        map.class_count(),
        map.way_count(),
        map.coord_count()
    );

    let projection = AzimuthalEqualArea::new(args.lat, args.lng);
    let options = ComposeOptions {
        page_width: args.map_width_km,
        // Page aspect ratio follows the output page
        page_height: args.map_width_km * args.plot.height / args.plot.width,
        lane_width_m: args.lane_width_m,
        ..ComposeOptions::default()
    };
    let drawing = compose::compose(&map, &projection, &options)?;
    tracing::info!("composed {} paths", drawing.path_count());

    let pipeline_options = args.plot.to_options();
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let outcome = pipeline::run(
        &drawing,
        &pipeline_options,
        || EbbDevice::open(port),
        &mut input,
    )?;

    if outcome == PipelineOutcome::OperatorQuit {
        // Clean operator abort: the session is closed, leave with success
        std::process::exit(0);
    }
    Ok(())
}
