//! Perception module for gridline robots
pub mod filters;
pub mod line;
pub mod localization;
pub mod sensors;

pub use line::{calibrate, Calibration, LineDetector};
pub use localization::{
    compute_correction, CrossingRecord, LightLocalizer, LocalizationPhase, LocalizationReport,
};
pub use sensors::{LineSensor, Odometer, RangeSensor};
