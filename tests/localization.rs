use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use gridline_core::common::shortest_angle;
use gridline_core::config::{GeometryConfig, LocalizerConfig, NavigatorConfig};
use gridline_core::navigation::DriveNavigator;
use gridline_core::perception::{LightLocalizer, LocalizationPhase, Odometer};
use gridline_core::sim::{
    DriveCommand, SimLineSensor, SimMotor, SimOdometer, SimWorld, TraceSample, Wheel, WheelMode,
};
use gridline_core::{CancelToken, DriveError, LocalizationError, Pose};

const FLOOR: f64 = 0.5;
const LINE: f64 = 0.1;

type SimLocalizer = LightLocalizer<
    SimMotor,
    SimMotor,
    SimLineSensor,
    SimOdometer,
    DriveNavigator<SimMotor, SimMotor, SimOdometer>,
>;

fn setup(config: LocalizerConfig) -> (SimWorld, SimLocalizer) {
    let world = SimWorld::new(GeometryConfig::default(), FLOOR);
    world.set_pose(Pose::new(-10.0, -10.0, 0.0));
    let navigator = DriveNavigator::new(NavigatorConfig::default(), world.drive(), world.odometer());
    let localizer = LightLocalizer::new(
        config,
        world.drive(),
        world.line_sensor(),
        world.odometer(),
        navigator,
    );
    (world, localizer)
}

fn calibration() -> Vec<TraceSample> {
    vec![TraceSample::floor(FLOOR); 4]
}

fn seeks() -> Vec<TraceSample> {
    vec![
        TraceSample::floor(FLOOR),
        TraceSample::floor(FLOOR),
        TraceSample::line(LINE),
        TraceSample::floor(FLOOR),
        TraceSample::line(LINE),
    ]
}

/// Scan that crosses lines at the given headings, with open floor in between
fn scan(headings: &[f64]) -> Vec<TraceSample> {
    headings
        .iter()
        .flat_map(|&heading| [TraceSample::floor(FLOOR), TraceSample::line_at(LINE, heading)])
        .collect()
}

fn full_trace(headings: &[f64]) -> Vec<TraceSample> {
    let mut trace = calibration();
    trace.extend(seeks());
    trace.extend(scan(headings));
    trace
}

/// Crossings at 0/90/180/270 commit (-d, -d) with the heading taken from the
/// end of the spin (270°). The 266° result for a 90° odometer heading is
/// checked by `correction_for_right_angle_crossings` in the localization module.
#[tokio::test(start_paused = true)]
async fn test_right_angle_crossings_correct_pose_and_return_home() {
    let (world, mut localizer) = setup(LocalizerConfig::default());
    world.push_line_trace(full_trace(&[0.0, 90.0, 180.0, 270.0]));

    let report = localizer.do_localization().await.unwrap();

    assert_eq!(report.crossing_angles, [0.0, 90.0, 180.0, 270.0]);
    assert_relative_eq!(report.calibration.baseline, FLOOR);
    assert_eq!(report.calibration.attempts, 1);

    // Heading when the spin stopped was 270: 176 - 0 + 270 = 446 -> 86
    assert_relative_eq!(report.corrected_pose.x, -2.4, epsilon = 1e-12);
    assert_relative_eq!(report.corrected_pose.y, -2.4, epsilon = 1e-12);
    assert_relative_eq!(report.corrected_pose.theta, 86.0, epsilon = 1e-12);

    // Navigation drove back to the origin and faces 0°
    let final_pose = localizer.odometer().pose();
    assert_eq!(final_pose, report.final_pose);
    assert!(final_pose.x.abs() < 1e-6, "x = {}", final_pose.x);
    assert!(final_pose.y.abs() < 1e-6, "y = {}", final_pose.y);
    assert!(shortest_angle(final_pose.theta, 0.0).abs() < 1e-6);

    assert_eq!(localizer.phase(), LocalizationPhase::Done);
    assert!(!localizer.is_navigating());
    assert_eq!(world.wheel(Wheel::Left).mode, WheelMode::Stopped);
    assert_eq!(world.wheel(Wheel::Right).mode, WheelMode::Stopped);
    assert_eq!(world.remaining_line_samples(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_without_return_commits_corrected_pose() {
    let config = LocalizerConfig {
        return_to_origin: false,
        ..LocalizerConfig::default()
    };
    let (world, mut localizer) = setup(config);
    world.push_line_trace(full_trace(&[20.0, 110.0, 140.0, 250.0]));

    assert!(!localizer.config().return_to_origin);
    let report = localizer.do_localization().await.unwrap();

    let expected_x = -2.4 * 60f64.to_radians().sin();
    let expected_y = -2.4 * 70f64.to_radians().sin();
    assert_relative_eq!(report.corrected_pose.x, expected_x, epsilon = 1e-12);
    assert_relative_eq!(report.corrected_pose.y, expected_y, epsilon = 1e-12);
    assert_relative_eq!(report.corrected_pose.theta, 46.0, epsilon = 1e-12);
    assert_eq!(world.odometer().pose(), report.corrected_pose);
    assert_eq!(report.final_pose, report.corrected_pose);
}

#[tokio::test(start_paused = true)]
async fn test_scripted_moves_follow_routine() {
    let config = LocalizerConfig {
        return_to_origin: false,
        ..LocalizerConfig::default()
    };
    let (world, mut localizer) = setup(config);
    world.push_line_trace(full_trace(&[0.0, 90.0, 180.0, 270.0]));
    localizer.do_localization().await.unwrap();

    let commands = world.commands();
    let rotations: Vec<(Wheel, f64)> = commands
        .iter()
        .filter_map(|c| match *c {
            DriveCommand::Rotate(wheel, degrees) => Some((wheel, degrees)),
            _ => None,
        })
        .collect();
    // Offset, quarter turn counter-clockwise, offset
    assert_eq!(rotations.len(), 6);
    assert_eq!(rotations[0].0, Wheel::Left);
    assert_eq!(rotations[1].0, Wheel::Right);
    assert_relative_eq!(rotations[0].1, rotations[1].1);
    assert!(rotations[2].1 < 0.0 && rotations[3].1 > 0.0);
    assert_relative_eq!(rotations[2].1, -rotations[3].1);
    assert_relative_eq!(rotations[4].1, rotations[0].1);

    // The scan spins counter-clockwise at rotation speed
    let spin = commands
        .iter()
        .position(|c| *c == DriveCommand::Backward(Wheel::Left))
        .expect("spin started");
    assert_eq!(commands[spin + 1], DriveCommand::Forward(Wheel::Right));
    assert!(commands[..spin].contains(&DriveCommand::SetSpeed(Wheel::Left, 80.0)));
    assert_eq!(
        &commands[commands.len() - 2..],
        &[DriveCommand::Stop(Wheel::Left), DriveCommand::Stop(Wheel::Right)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_calibration_retries_when_started_on_a_line() {
    let (world, mut localizer) = setup(LocalizerConfig::default());
    world.push_line_trace(vec![TraceSample::floor(0.02); 4]);
    world.push_line_trace(full_trace(&[0.0, 90.0, 180.0, 270.0]));

    let report = localizer.do_localization().await.unwrap();
    assert_eq!(report.calibration.attempts, 2);
    assert!(report.calibration.baseline >= 0.05);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_sensor_times_out_while_seeking() {
    let (world, mut localizer) = setup(LocalizerConfig::default());
    world.push_line_trace(calibration());

    let start = tokio::time::Instant::now();
    let err = localizer.do_localization().await.unwrap_err();

    match err {
        LocalizationError::SensorTimeout { phase, waited } => {
            assert_eq!(phase, LocalizationPhase::SeekLine1);
            assert_eq!(waited, Duration::from_secs(30));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert_eq!(world.wheel(Wheel::Left).mode, WheelMode::Stopped);
    assert_eq!(world.wheel(Wheel::Right).mode, WheelMode::Stopped);
    assert!(!localizer.is_navigating());

    // Only the heading reset reached the odometer
    let pose = world.odometer().pose();
    assert_eq!((pose.x, pose.y, pose.theta), (-10.0, -10.0, 90.0));
}

#[tokio::test(start_paused = true)]
async fn test_missing_crossings_time_out_during_scan() {
    let config = LocalizerConfig {
        scan_timeout_ms: 5_000,
        ..LocalizerConfig::default()
    };
    let (world, mut localizer) = setup(config);
    let mut trace = calibration();
    trace.extend(seeks());
    trace.extend(scan(&[0.0, 90.0]));
    world.push_line_trace(trace);

    let err = localizer.do_localization().await.unwrap_err();
    assert!(matches!(
        err,
        LocalizationError::SensorTimeout {
            phase: LocalizationPhase::ScanCrossings,
            ..
        }
    ));
    assert_eq!(world.wheel(Wheel::Left).mode, WheelMode::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_seek() {
    let (world, localizer) = setup(LocalizerConfig::default());
    world.push_line_trace(calibration());
    let cancel = CancelToken::new();
    let mut localizer = localizer.with_cancel_token(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let start = tokio::time::Instant::now();
    let err = localizer.do_localization().await.unwrap_err();
    assert!(matches!(
        err,
        LocalizationError::Interrupted {
            phase: LocalizationPhase::SeekLine1
        }
    ));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(world.wheel(Wheel::Right).mode, WheelMode::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_crossing_cue_fires_for_every_line() {
    let (world, localizer) = setup(LocalizerConfig::default());
    world.push_line_trace(full_trace(&[0.0, 90.0, 180.0, 270.0]));
    let beeps = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&beeps);
    let mut localizer = localizer.with_crossing_cue(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    localizer.do_localization().await.unwrap();
    assert_eq!(beeps.load(Ordering::SeqCst), 6);
}

#[tokio::test(start_paused = true)]
async fn test_drive_failure_is_reported() {
    let (world, mut localizer) = setup(LocalizerConfig::default());
    world.push_line_trace(full_trace(&[0.0, 90.0, 180.0, 270.0]));
    world.set_stalled(Wheel::Left, true);

    let err = localizer.do_localization().await.unwrap_err();
    assert!(matches!(
        err,
        LocalizationError::Drive(DriveError::Stalled { wheel: "left" })
    ));
    assert_eq!(localizer.phase(), LocalizationPhase::OffsetAndTurn1);
}
