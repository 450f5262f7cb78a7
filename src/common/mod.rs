//! Common utilities and types for gridline robots

/// Common types used across the codebase
pub mod types {
    use nalgebra::Point2;

    use super::angles::fix_deg_angle;

    /// A 2D pose (x, y, theta)
    ///
    /// `theta` is in degrees, counter-clockwise positive with 0° along +x,
    /// and is kept normalized to `[0, 360)`.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Pose {
        pub x: f64,
        pub y: f64,
        pub theta: f64,
    }

    impl Pose {
        /// Create a new pose, normalizing the heading
        pub fn new(x: f64, y: f64, theta: f64) -> Self {
            Pose {
                x,
                y,
                theta: fix_deg_angle(theta),
            }
        }

        /// The position part of the pose
        pub fn position(&self) -> Point2<f64> {
            Point2::new(self.x, self.y)
        }
    }

    impl Default for Pose {
        fn default() -> Self {
            Pose::new(0.0, 0.0, 0.0)
        }
    }

    impl std::fmt::Display for Pose {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "({:.2}, {:.2}, {:.1}°)", self.x, self.y, self.theta)
        }
    }
}

/// Degree-based angle helpers
pub mod angles {
    /// Normalize an angle in degrees into `[0, 360)`.
    ///
    /// The result is congruent to the input modulo 360.
    pub fn fix_deg_angle(degrees: f64) -> f64 {
        let angle = degrees.rem_euclid(360.0);
        // rem_euclid rounds tiny negative inputs up to exactly 360
        if angle >= 360.0 {
            0.0
        } else {
            angle
        }
    }

    /// Signed difference `to - from` folded into `(-180, 180]`
    pub fn shortest_angle(from: f64, to: f64) -> f64 {
        let delta = fix_deg_angle(to - from);
        if delta > 180.0 {
            delta - 360.0
        } else {
            delta
        }
    }
}

/// Wheel geometry conversions for a differential drive
pub mod geometry {
    use std::f64::consts::PI;

    /// Degrees of wheel rotation needed to roll `distance` on a wheel of `radius`
    pub fn convert_distance(radius: f64, distance: f64) -> f64 {
        (180.0 * distance) / (PI * radius)
    }

    /// Degrees of wheel rotation for each wheel to turn the chassis in place by `angle` degrees
    pub fn convert_angle(radius: f64, track_width: f64, angle: f64) -> f64 {
        convert_distance(radius, PI * track_width * angle / 360.0)
    }

    /// Distance rolled by a wheel of `radius` turning `degrees`
    pub fn wheel_arc(radius: f64, degrees: f64) -> f64 {
        degrees * PI * radius / 180.0
    }
}

pub use angles::{fix_deg_angle, shortest_angle};
pub use types::Pose;

#[cfg(test)]
mod tests {
    use super::geometry::{convert_angle, convert_distance, wheel_arc};
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fix_deg_angle_stays_in_range_and_congruent() {
        let inputs = [
            0.0, 359.999, 360.0, 720.5, -0.0, -1.0, -90.0, -360.0, -1e-17, 1e9, -1e9, 446.0, 176.5,
        ];
        for d in inputs {
            let fixed = fix_deg_angle(d);
            assert!((0.0..360.0).contains(&fixed), "{d} -> {fixed}");
            let turns = (d - fixed) / 360.0;
            assert!((turns - turns.round()).abs() < 1e-6, "{d} -> {fixed}");
        }
        assert_eq!(fix_deg_angle(446.0), 86.0);
        assert_eq!(fix_deg_angle(-90.0), 270.0);
    }

    #[test]
    fn shortest_angle_picks_smaller_turn() {
        assert_relative_eq!(shortest_angle(86.0, 45.0), -41.0);
        assert_relative_eq!(shortest_angle(350.0, 10.0), 20.0);
        assert_relative_eq!(shortest_angle(10.0, 350.0), -20.0);
        assert_relative_eq!(shortest_angle(0.0, 180.0), 180.0);
    }

    #[test]
    fn wheel_conversions_are_consistent() {
        let radius = 2.1;
        let width = 15.2;
        assert_relative_eq!(wheel_arc(radius, convert_distance(radius, 30.48)), 30.48, epsilon = 1e-9);
        // Half a revolution in place rolls each wheel a quarter of the track circle
        let wheel_deg = convert_angle(radius, width, 180.0);
        assert_relative_eq!(
            wheel_arc(radius, wheel_deg),
            std::f64::consts::PI * width / 2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn pose_normalizes_heading() {
        let pose = Pose::new(1.0, -2.0, -90.0);
        assert_eq!(pose.theta, 270.0);
        assert_eq!(pose.position(), nalgebra::Point2::new(1.0, -2.0));
    }
}
