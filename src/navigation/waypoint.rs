//! Turn-then-drive waypoint navigation

use nalgebra::{Point2, Vector2};

use super::Navigator;
use crate::common::{fix_deg_angle, shortest_angle};
use crate::config::NavigatorConfig;
use crate::control::{DifferentialDrive, Motor};
use crate::error::NavigationError;
use crate::perception::sensors::Odometer;

/// A navigator that turns toward each target and rolls straight to it
///
/// Moves are open loop: distances and angles are converted to wheel
/// rotations from the pose read before each move.
pub struct DriveNavigator<L, R, O> {
    config: NavigatorConfig,
    drive: DifferentialDrive<L, R>,
    odometer: O,
}

impl<L: Motor, R: Motor, O: Odometer> DriveNavigator<L, R, O> {
    /// Create a new navigator
    pub fn new(config: NavigatorConfig, drive: DifferentialDrive<L, R>, odometer: O) -> Self {
        DriveNavigator {
            config,
            drive,
            odometer,
        }
    }

    pub fn odometer(&self) -> &O {
        &self.odometer
    }

    async fn turn(&mut self, theta: f64, minimal: bool) -> Result<(), NavigationError> {
        if !theta.is_finite() {
            return Err(NavigationError::InvalidHeading(theta));
        }
        let current = self.odometer.theta();
        let counter_clockwise = if minimal {
            shortest_angle(current, theta)
        } else {
            fix_deg_angle(theta - current)
        };
        log::debug!(
            "Turning from {:.1}° to {:.1}° ({:+.1}°)",
            current,
            theta,
            counter_clockwise
        );
        if counter_clockwise == 0.0 {
            return Ok(());
        }

        let radius = self.odometer.wheel_radius();
        let width = self.odometer.track_width();
        self.drive.set_speed(self.config.rotate_speed)?;
        // Positive in-place rotation is clockwise
        self.drive
            .rotate_in_place(radius, width, -counter_clockwise)
            .await?;
        Ok(())
    }

    async fn travel(&mut self, x: f64, y: f64) -> Result<(), NavigationError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(NavigationError::InvalidTarget { x, y });
        }
        let pose = self.odometer.pose();
        let delta: Vector2<f64> = Point2::new(x, y) - pose.position();
        let distance = delta.norm();
        if distance <= self.config.arrival_tolerance {
            log::debug!("Already within {:.2} of ({:.2}, {:.2})", distance, x, y);
            return Ok(());
        }

        log::info!("Travelling from {} to ({:.2}, {:.2})", pose, x, y);
        self.turn(delta.y.atan2(delta.x).to_degrees(), true).await?;

        let radius = self.odometer.wheel_radius();
        self.drive.set_speed(self.config.forward_speed)?;
        self.drive.move_distance(radius, distance).await?;
        Ok(())
    }
}

impl<L: Motor, R: Motor, O: Odometer> Navigator for DriveNavigator<L, R, O> {
    async fn travel_to(&mut self, x: f64, y: f64) -> Result<(), NavigationError> {
        self.travel(x, y).await
    }

    async fn turn_to(&mut self, theta: f64, minimal: bool) -> Result<(), NavigationError> {
        self.turn(theta, minimal).await
    }
}
