//! Controllers for the robot

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::{DifferentialDrive, Motor};
use crate::config::WallFollowerConfig;
use crate::error::{ControlError, DriveError};
use crate::perception::filters::{DropoutFilter, Filter};
use crate::perception::sensors::RangeSensor;
use crate::CancelToken;

/// Speeds for the two wheels, in degrees per second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSpeeds {
    pub left: u32,
    pub right: u32,
}

/// A proportional wall follower for differential drive robots
///
/// The wall is on the robot's left; a positive error means the robot is too
/// close and steers away by speeding up the left wheel.
#[derive(Debug)]
pub struct WallFollower {
    config: WallFollowerConfig,
    filter: DropoutFilter,
    distance: u32,
}

impl WallFollower {
    /// Create a new controller
    pub fn new(config: WallFollowerConfig) -> Self {
        let filter = DropoutFilter::new(config.no_wall_distance, config.filter_out);
        WallFollower {
            config,
            filter,
            distance: 0,
        }
    }

    /// Speeds to start rolling with before the first reading
    pub fn initial_speeds(&self) -> WheelSpeeds {
        WheelSpeeds {
            left: self.config.motor_high,
            right: self.config.motor_high,
        }
    }

    /// The last distance accepted by the filter
    pub fn read_distance(&self) -> u32 {
        self.distance
    }

    /// Process a range reading
    ///
    /// Returns the new wheel speeds, or `None` when the wheels should keep
    /// their current speeds (dropout readings, including an accepted
    /// sustained "no wall").
    pub fn process_distance(&mut self, distance: u32) -> Option<WheelSpeeds> {
        let accepted = self.filter.filter(distance)?;
        self.distance = accepted;
        if accepted >= self.config.no_wall_distance {
            return None;
        }

        let error = i64::from(self.config.band_center) - i64::from(accepted);
        if error.unsigned_abs() <= u64::from(self.config.bandwidth) {
            return Some(self.initial_speeds());
        }

        let scaled = self.config.scaling_factor * error.unsigned_abs() as f64;
        let low = (f64::from(self.config.motor_low) / scaled) as u32;
        let high = (f64::from(self.config.motor_high) * scaled) as u32;
        let slow = low.max(self.config.min_speed);
        let fast = high.min(self.config.max_speed);

        let speeds = if error > 0 {
            WheelSpeeds {
                left: fast,
                right: slow,
            }
        } else {
            WheelSpeeds {
                left: slow,
                right: fast,
            }
        };
        Some(speeds)
    }

    /// Push speeds to the drive and keep rolling forward
    pub fn apply<L: Motor, R: Motor>(
        &self,
        drive: &mut DifferentialDrive<L, R>,
        speeds: WheelSpeeds,
    ) -> Result<(), DriveError> {
        drive.set_speeds(f64::from(speeds.left), f64::from(speeds.right))?;
        drive.forward()
    }

    /// Follow the wall until cancelled, sampling the range sensor every `period`
    ///
    /// Returns the number of readings processed. The drive is halted on exit.
    pub async fn run<L: Motor, R: Motor, S: RangeSensor>(
        &mut self,
        drive: &mut DifferentialDrive<L, R>,
        sensor: &mut S,
        period: Duration,
        cancel: &CancelToken,
    ) -> Result<usize, ControlError> {
        let result = self.follow(drive, sensor, period, cancel).await;
        drive.halt().await?;
        result
    }

    async fn follow<L: Motor, R: Motor, S: RangeSensor>(
        &mut self,
        drive: &mut DifferentialDrive<L, R>,
        sensor: &mut S,
        period: Duration,
        cancel: &CancelToken,
    ) -> Result<usize, ControlError> {
        self.apply(drive, self.initial_speeds())?;

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut readings = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => return Ok(readings),
            }
            let distance = sensor.fetch_distance()?;
            readings += 1;
            if let Some(speeds) = self.process_distance(distance) {
                log::trace!("distance {} -> speeds {:?}", distance, speeds);
                self.apply(drive, speeds)?;
            }
        }
    }
}
