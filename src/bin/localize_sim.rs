use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gridline_core::control::controllers::WallFollower;
use gridline_core::navigation::DriveNavigator;
use gridline_core::perception::{LightLocalizer, Odometer};
use gridline_core::sim::{SimWorld, TraceSample};
use gridline_core::{CancelToken, Pose, RobotConfig};

/// Run light localization and wall following against the simulated robot
#[derive(Debug, Parser)]
#[command(name = "localize_sim")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stay at the intersection instead of driving to the origin
    #[arg(long)]
    no_return: bool,

    /// Script a sensor that never sees a line, to exercise the timeout path
    #[arg(long)]
    stalled: bool,

    /// Headings (degrees) at which the scan sees the four lines
    #[arg(long, num_args = 4, default_values_t = [12.0, 101.0, 193.0, 279.0])]
    crossings: Vec<f64>,
}

const FLOOR: f64 = 0.52;
const LINE: f64 = 0.18;

fn load_config(args: &Args) -> Result<RobotConfig> {
    let mut config = match &args.config {
        Some(path) => RobotConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RobotConfig::default(),
    };
    if args.no_return {
        config.localizer.return_to_origin = false;
    }
    Ok(config)
}

/// Reflectance trace for one run: calibration, two line seeks and a four-line scan
fn localization_trace(crossings: &[f64]) -> Vec<TraceSample> {
    let mut trace = vec![TraceSample::floor(FLOOR); 4];
    for approach in [6, 3] {
        trace.extend(std::iter::repeat(TraceSample::floor(FLOOR)).take(approach));
        trace.push(TraceSample::line(LINE));
    }
    for &heading in crossings {
        trace.push(TraceSample::at(FLOOR, heading - 5.0));
        trace.push(TraceSample::line_at(LINE, heading));
    }
    trace
}

async fn localize(world: &SimWorld, config: &RobotConfig, cancel: &CancelToken) -> Result<()> {
    let navigator = DriveNavigator::new(config.navigator.clone(), world.drive(), world.odometer());
    let mut localizer = LightLocalizer::new(
        config.localizer.clone(),
        world.drive(),
        world.line_sensor(),
        world.odometer(),
        navigator,
    )
    .with_cancel_token(cancel.clone())
    .with_crossing_cue(|phase| println!("  *beep* ({phase})"));

    println!(
        "Localizing from {} with the sensor {:.1} from the wheel axis",
        localizer.odometer().pose(),
        localizer.config().sensor_dist
    );
    let report = localizer
        .do_localization()
        .await
        .context("light localization failed")?;

    println!(
        "Baseline: {:.3} ({} attempt(s))",
        report.calibration.baseline, report.calibration.attempts
    );
    println!("Crossings: {:?}", report.crossing_angles);
    println!("Corrected pose: {}", report.corrected_pose);
    println!("Final pose: {}", report.final_pose);
    Ok(())
}

async fn follow_wall(world: &SimWorld, config: &RobotConfig, cancel: &CancelToken) -> Result<()> {
    let distances: Vec<u32> = [30, 28, 22, 18, 35, 41, 33]
        .into_iter()
        .chain(std::iter::repeat(255).take(22))
        .chain([31])
        .collect();
    let period = Duration::from_millis(20);
    world.push_range_trace(distances.iter().copied());

    let mut follower = WallFollower::new(config.wall_follower.clone());
    let mut drive = world.drive();
    let mut sensor = world.range_sensor();

    let stop = cancel.clone();
    let runtime = period * distances.len() as u32;
    let timer = tokio::spawn(async move {
        tokio::time::sleep(runtime).await;
        stop.cancel();
    });

    let readings = follower
        .run(&mut drive, &mut sensor, period, cancel)
        .await
        .context("wall following failed")?;
    timer.abort();

    println!(
        "Wall follower processed {} readings, last distance {}",
        readings,
        follower.read_distance()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let world = SimWorld::new(config.geometry.clone(), FLOOR);
    world.set_pose(Pose::new(-4.0, -3.5, 0.0));
    if args.stalled {
        world.push_line_trace(vec![TraceSample::floor(FLOOR); 4]);
    } else {
        world.push_line_trace(localization_trace(&args.crossings));
    }

    let cancel = CancelToken::new();
    let wall_cancel = CancelToken::new();
    let (interrupt, interrupt_wall) = (cancel.clone(), wall_cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
            interrupt_wall.cancel();
        }
    });

    localize(&world, &config, &cancel).await?;
    follow_wall(&world, &config, &wall_cancel).await?;
    Ok(())
}
