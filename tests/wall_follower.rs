use std::time::Duration;

use gridline_core::config::{GeometryConfig, WallFollowerConfig};
use gridline_core::control::controllers::WallFollower;
use gridline_core::sim::{DriveCommand, SimWorld, Wheel, WheelMode};
use gridline_core::CancelToken;

fn speed_commands(left: f64, right: f64) -> [DriveCommand; 4] {
    [
        DriveCommand::SetSpeed(Wheel::Left, left),
        DriveCommand::SetSpeed(Wheel::Right, right),
        DriveCommand::Forward(Wheel::Left),
        DriveCommand::Forward(Wheel::Right),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_follower_steers_then_ignores_lost_wall() {
    let world = SimWorld::new(GeometryConfig::default(), 0.5);
    world.push_range_trace([30, 20]);
    world.push_range_trace(std::iter::repeat(255).take(25));

    let mut follower = WallFollower::new(WallFollowerConfig::default());
    let mut drive = world.drive();
    let mut sensor = world.range_sensor();
    let period = Duration::from_millis(10);

    let cancel = CancelToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(period * 40).await;
        stop.cancel();
    });

    let readings = follower
        .run(&mut drive, &mut sensor, period, &cancel)
        .await
        .unwrap();

    assert!(readings >= 27, "only {readings} readings");
    // The sustained dropout is finally accepted but does not change speeds
    assert_eq!(follower.read_distance(), 255);

    let mut expected = Vec::new();
    expected.extend(speed_commands(200.0, 200.0));
    expected.extend(speed_commands(200.0, 200.0));
    expected.extend(speed_commands(180.0, 70.0));
    expected.push(DriveCommand::Stop(Wheel::Left));
    expected.push(DriveCommand::Stop(Wheel::Right));
    assert_eq!(world.commands(), expected);
    assert_eq!(world.wheel(Wheel::Left).mode, WheelMode::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_follower_stops_immediately_when_already_cancelled() {
    let world = SimWorld::new(GeometryConfig::default(), 0.5);
    let mut follower = WallFollower::new(WallFollowerConfig::default());
    let mut drive = world.drive();
    let mut sensor = world.range_sensor();

    let cancel = CancelToken::new();
    cancel.cancel();
    let readings = follower
        .run(&mut drive, &mut sensor, Duration::from_millis(10), &cancel)
        .await
        .unwrap();

    // The first tick is ready at once, so at most one reading slips through
    assert!(readings <= 1);
    assert_eq!(world.wheel(Wheel::Right).mode, WheelMode::Stopped);
}
