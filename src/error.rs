//! Error types for gridline components

use std::time::Duration;

use thiserror::Error;

use crate::perception::localization::LocalizationPhase;

/// Errors raised by a reflectance or range sensor
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    /// The sensor returned a value that is not a finite number.
    #[error("sensor returned a non-finite sample: {0}")]
    NonFinite(f64),
    /// The sensor could not be read.
    #[error("sensor read failed: {0}")]
    ReadFailed(String),
}

/// Errors raised by a wheel motor
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriveError {
    #[error("{wheel} motor rejected command: {reason}")]
    CommandRejected { wheel: &'static str, reason: String },
    #[error("{wheel} motor stalled")]
    Stalled { wheel: &'static str },
}

/// Errors raised by a reactive control loop
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Drive(#[from] DriveError),
}

/// Errors raised while navigating to a waypoint
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("drive failure while navigating: {0}")]
    Drive(#[from] DriveError),
    #[error("target ({x}, {y}) is not a finite point")]
    InvalidTarget { x: f64, y: f64 },
    #[error("heading {0} is not finite")]
    InvalidHeading(f64),
}

/// Errors produced by a localization run
#[derive(Debug, Error)]
pub enum LocalizationError {
    /// No grid line was detected before the phase deadline.
    #[error("no line detected during {phase} within {waited:?}")]
    SensorTimeout {
        phase: LocalizationPhase,
        waited: Duration,
    },
    /// The floor baseline stayed below the validity threshold.
    #[error("calibration baseline {baseline:.3} still invalid after {attempts} attempts")]
    InvalidCalibration { attempts: u32, baseline: f64 },
    /// The run was cancelled while waiting.
    #[error("localization interrupted during {phase}")]
    Interrupted { phase: LocalizationPhase },
    /// The scan ended without four crossings.
    #[error("scan finished with {captured} of 4 crossings")]
    IncompleteScan { captured: usize },
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
