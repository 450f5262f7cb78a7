//! Controllers for a differential-drive robot on a gridded floor
//!
//! * [`perception::LightLocalizer`] corrects dead-reckoning drift by
//!   spinning over a grid intersection and timing the four line crossings
//!   seen by a downward-facing light sensor.
//! * [`control::controllers::WallFollower`] keeps a fixed distance from a
//!   wall with a proportional steering law.
//!
//! Hardware is reached through the [`control::Motor`],
//! [`perception::LineSensor`], [`perception::RangeSensor`] and
//! [`perception::Odometer`] traits; [`sim`] implements them without a robot.

pub mod cancel;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod navigation;
pub mod perception;
pub mod sim;

pub use cancel::{CancelToken, Cancelled};
pub use common::Pose;
pub use config::RobotConfig;
pub use error::{ConfigError, ControlError, DriveError, LocalizationError, NavigationError, SensorError};
