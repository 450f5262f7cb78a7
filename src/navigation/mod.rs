//! Navigation module for gridline robots
pub mod waypoint;

use std::future::Future;

use crate::error::NavigationError;

pub use self::waypoint::DriveNavigator;

/// Drives the robot to waypoints using the odometer's pose estimate
pub trait Navigator: Send {
    /// Travel to the point (x, y)
    fn travel_to(
        &mut self,
        x: f64,
        y: f64,
    ) -> impl Future<Output = Result<(), NavigationError>> + Send;

    /// Turn in place to face `theta` degrees
    ///
    /// With `minimal` the shorter of the two turns is taken, otherwise the
    /// robot always turns counter-clockwise.
    fn turn_to(
        &mut self,
        theta: f64,
        minimal: bool,
    ) -> impl Future<Output = Result<(), NavigationError>> + Send;
}
