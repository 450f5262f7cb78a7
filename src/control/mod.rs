//! Control module for gridline robots
pub mod controllers;

use std::future::Future;

use crate::common::geometry::{convert_angle, convert_distance};
use crate::error::DriveError;

/// A speed-regulated wheel motor
///
/// Speeds are in degrees of wheel rotation per second. `rotate` and `stop`
/// resolve once the wheel has finished the command, so two wheels can be
/// commanded together and joined.
pub trait Motor: Send {
    /// Set the regulated speed used by subsequent commands
    fn set_speed(&mut self, speed: f64) -> Result<(), DriveError>;

    /// Run forward until told otherwise
    fn forward(&mut self) -> Result<(), DriveError>;

    /// Run backward until told otherwise
    fn backward(&mut self) -> Result<(), DriveError>;

    /// Halt the wheel
    fn stop(&mut self) -> impl Future<Output = Result<(), DriveError>> + Send;

    /// Rotate the wheel by a relative number of degrees
    fn rotate(&mut self, degrees: f64) -> impl Future<Output = Result<(), DriveError>> + Send;
}

/// Two independently driven wheels
pub struct DifferentialDrive<L, R> {
    left: L,
    right: R,
}

impl<L: Motor, R: Motor> DifferentialDrive<L, R> {
    /// Create a new drive from its left and right motors
    pub fn new(left: L, right: R) -> Self {
        DifferentialDrive { left, right }
    }

    /// Set both wheel speeds
    pub fn set_speeds(&mut self, left: f64, right: f64) -> Result<(), DriveError> {
        self.left.set_speed(left)?;
        self.right.set_speed(right)
    }

    /// Set the same speed on both wheels
    pub fn set_speed(&mut self, speed: f64) -> Result<(), DriveError> {
        self.set_speeds(speed, speed)
    }

    /// Drive both wheels forward continuously
    pub fn forward(&mut self) -> Result<(), DriveError> {
        self.left.forward()?;
        self.right.forward()
    }

    /// Spin in place counter-clockwise until halted
    pub fn spin_counter_clockwise(&mut self) -> Result<(), DriveError> {
        self.left.backward()?;
        self.right.forward()
    }

    /// Stop both wheels and wait until both have halted
    ///
    /// Both wheels are always commanded; the left wheel's error wins if both fail.
    pub async fn halt(&mut self) -> Result<(), DriveError> {
        let (left, right) = (&mut self.left, &mut self.right);
        let (left, right) = tokio::join!(left.stop(), right.stop());
        left.and(right)
    }

    /// Issue a relative rotation to each wheel, then wait for both
    pub async fn rotate_wheels(&mut self, left_deg: f64, right_deg: f64) -> Result<(), DriveError> {
        let (left, right) = (&mut self.left, &mut self.right);
        let (left, right) = tokio::join!(left.rotate(left_deg), right.rotate(right_deg));
        left.and(right)
    }

    /// Roll straight by `distance` (negative drives backward)
    pub async fn move_distance(&mut self, wheel_radius: f64, distance: f64) -> Result<(), DriveError> {
        let degrees = convert_distance(wheel_radius, distance);
        self.rotate_wheels(degrees, degrees).await
    }

    /// Turn in place by `angle` degrees, clockwise positive
    pub async fn rotate_in_place(
        &mut self,
        wheel_radius: f64,
        track_width: f64,
        angle: f64,
    ) -> Result<(), DriveError> {
        let degrees = convert_angle(wheel_radius, track_width, angle);
        self.rotate_wheels(degrees, -degrees).await
    }
}
