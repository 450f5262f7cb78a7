//! Sensor and pose-store interfaces for gridline robots

use crate::common::Pose;
use crate::error::SensorError;

/// A downward-facing reflectance sensor
pub trait LineSensor: Send {
    /// Read one reflectance sample, nominally in `[0, 1]`
    fn fetch_sample(&mut self) -> Result<f64, SensorError>;
}

/// A range finder pointed at the wall
pub trait RangeSensor: Send {
    /// Read one distance; values at the sensor's ceiling mean no echo
    fn fetch_distance(&mut self) -> Result<u32, SensorError>;
}

/// The running pose estimate maintained by odometry
///
/// Headings are in degrees and kept normalized to `[0, 360)`.
pub trait Odometer: Send {
    /// Current pose estimate
    fn pose(&self) -> Pose;

    /// Current heading estimate
    fn theta(&self) -> f64 {
        self.pose().theta
    }

    /// Overwrite the heading
    fn set_theta(&mut self, theta: f64) {
        self.set_position([0.0, 0.0, theta], [false, false, true]);
    }

    /// Overwrite the axes selected by `update` with the matching `values` (x, y, theta)
    fn set_position(&mut self, values: [f64; 3], update: [bool; 3]);

    fn wheel_radius(&self) -> f64;

    fn track_width(&self) -> f64;
}

/// Read one sample and reject values that are not finite
pub fn read_checked<S: LineSensor + ?Sized>(sensor: &mut S) -> Result<f64, SensorError> {
    let sample = sensor.fetch_sample()?;
    if sample.is_finite() {
        Ok(sample)
    } else {
        Err(SensorError::NonFinite(sample))
    }
}
