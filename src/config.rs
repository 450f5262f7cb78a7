//! Configuration for the robot, its localizer and its controllers
//!
//! Every table can be loaded from TOML (missing keys fall back to the
//! defaults below) and tuned afterwards from a flat parameter map, e.g.
//!
//! ```toml
//! [geometry]
//! wheel_radius = 2.1
//! track_width = 15.2
//!
//! [localizer]
//! sensor_dist = 2.4
//! heading_reference = 176.0
//! seek_timeout_ms = 30000
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Physical constants of the differential drive (centimetres)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub wheel_radius: f64,
    pub track_width: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        GeometryConfig {
            wheel_radius: 2.1,
            track_width: 15.2,
        }
    }
}

impl GeometryConfig {
    /// Configure from a parameter map
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), ConfigError> {
        if let Some(&wheel_radius) = params.get("wheel_radius") {
            self.wheel_radius = wheel_radius;
        }
        if let Some(&track_width) = params.get("track_width") {
            self.track_width = track_width;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("wheel_radius", self.wheel_radius)?;
        positive("track_width", self.track_width).map(|_| ())
    }
}

/// Tunables of the light-sensor localization routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Wheel speed while seeking a line (degrees/s)
    pub forward_speed: f64,
    /// Wheel speed during the crossing scan (degrees/s)
    pub rotation_speed: f64,
    /// Distance from the light sensor to the centre of rotation
    pub sensor_dist: f64,
    /// Margin below the baseline that counts as a line
    pub line_buffer: f64,
    /// Baselines below this mean the sensor sat on a line while calibrating
    pub min_baseline: f64,
    pub samples_per_baseline: u32,
    pub max_calibration_attempts: u32,
    /// Heading written to the odometer before the run starts
    pub initial_theta: f64,
    /// Empirical heading correction; 176 rather than 180 absorbs the sensor offset bias
    pub heading_reference: f64,
    pub init_settle_ms: u64,
    pub calibration_retry_ms: u64,
    /// Pause after a crossing so the same line is not counted twice
    pub crossing_debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub seek_timeout_ms: u64,
    pub scan_timeout_ms: u64,
    /// Drive to (0, 0) and face 0° once the pose is corrected
    pub return_to_origin: bool,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        LocalizerConfig {
            forward_speed: 90.0,
            rotation_speed: 80.0,
            sensor_dist: 2.4,
            line_buffer: 0.05,
            min_baseline: 0.05,
            samples_per_baseline: 4,
            max_calibration_attempts: 10,
            initial_theta: 90.0,
            heading_reference: 176.0,
            init_settle_ms: 200,
            calibration_retry_ms: 200,
            crossing_debounce_ms: 400,
            poll_interval_ms: 10,
            seek_timeout_ms: 30_000,
            scan_timeout_ms: 60_000,
            return_to_origin: true,
        }
    }
}

impl LocalizerConfig {
    pub fn init_settle(&self) -> Duration {
        Duration::from_millis(self.init_settle_ms)
    }

    pub fn calibration_retry_delay(&self) -> Duration {
        Duration::from_millis(self.calibration_retry_ms)
    }

    pub fn crossing_debounce(&self) -> Duration {
        Duration::from_millis(self.crossing_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// Configure from a parameter map
    ///
    /// Durations are given in milliseconds, counts are truncated and
    /// `return_to_origin` is true for any non-zero value.
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), ConfigError> {
        for (key, slot) in [
            ("forward_speed", &mut self.forward_speed),
            ("rotation_speed", &mut self.rotation_speed),
            ("sensor_dist", &mut self.sensor_dist),
            ("line_buffer", &mut self.line_buffer),
            ("min_baseline", &mut self.min_baseline),
            ("initial_theta", &mut self.initial_theta),
            ("heading_reference", &mut self.heading_reference),
        ] {
            if let Some(&value) = params.get(key) {
                *slot = value;
            }
        }

        for (key, slot) in [
            ("samples_per_baseline", &mut self.samples_per_baseline),
            ("max_calibration_attempts", &mut self.max_calibration_attempts),
        ] {
            if let Some(&value) = params.get(key) {
                *slot = non_negative(key, value)? as u32;
            }
        }

        for (key, slot) in [
            ("init_settle_ms", &mut self.init_settle_ms),
            ("calibration_retry_ms", &mut self.calibration_retry_ms),
            ("crossing_debounce_ms", &mut self.crossing_debounce_ms),
            ("poll_interval_ms", &mut self.poll_interval_ms),
            ("seek_timeout_ms", &mut self.seek_timeout_ms),
            ("scan_timeout_ms", &mut self.scan_timeout_ms),
        ] {
            if let Some(&value) = params.get(key) {
                *slot = non_negative(key, value)? as u64;
            }
        }

        if let Some(&value) = params.get("return_to_origin") {
            self.return_to_origin = value != 0.0;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("forward_speed", self.forward_speed)?;
        positive("rotation_speed", self.rotation_speed)?;
        positive("sensor_dist", self.sensor_dist)?;
        finite("initial_theta", self.initial_theta)?;
        finite("heading_reference", self.heading_reference)?;
        if !(0.0..1.0).contains(&self.line_buffer) {
            return Err(ConfigError::invalid("line_buffer", "must lie in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.min_baseline) {
            return Err(ConfigError::invalid("min_baseline", "must lie in [0, 1)"));
        }
        if self.samples_per_baseline == 0 {
            return Err(ConfigError::invalid("samples_per_baseline", "must be at least 1"));
        }
        if self.max_calibration_attempts == 0 {
            return Err(ConfigError::invalid("max_calibration_attempts", "must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms", "must be at least 1"));
        }
        if self.seek_timeout_ms == 0 || self.scan_timeout_ms == 0 {
            return Err(ConfigError::invalid("seek_timeout_ms", "timeouts must be non-zero"));
        }
        Ok(())
    }
}

/// Speeds and tolerances of the waypoint navigator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub forward_speed: f64,
    pub rotate_speed: f64,
    /// Targets closer than this are considered reached
    pub arrival_tolerance: f64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        NavigatorConfig {
            forward_speed: 150.0,
            rotate_speed: 100.0,
            arrival_tolerance: 0.5,
        }
    }
}

impl NavigatorConfig {
    /// Configure from a parameter map
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), ConfigError> {
        if let Some(&forward_speed) = params.get("forward_speed") {
            self.forward_speed = forward_speed;
        }
        if let Some(&rotate_speed) = params.get("rotate_speed") {
            self.rotate_speed = rotate_speed;
        }
        if let Some(&arrival_tolerance) = params.get("arrival_tolerance") {
            self.arrival_tolerance = arrival_tolerance;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("forward_speed", self.forward_speed)?;
        positive("rotate_speed", self.rotate_speed)?;
        non_negative("arrival_tolerance", self.arrival_tolerance).map(|_| ())
    }
}

/// Reference band and speed limits of the proportional wall follower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallFollowerConfig {
    /// Target distance from the wall
    pub band_center: u32,
    /// Error tolerated either side of the band centre
    pub bandwidth: u32,
    pub motor_high: u32,
    pub motor_low: u32,
    pub min_speed: u32,
    pub max_speed: u32,
    pub scaling_factor: f64,
    /// Consecutive out-of-range readings ignored before "no wall" is believed
    pub filter_out: u32,
    /// Readings at or above this mean no echo
    pub no_wall_distance: u32,
}

impl Default for WallFollowerConfig {
    fn default() -> Self {
        WallFollowerConfig {
            band_center: 30,
            bandwidth: 3,
            motor_high: 200,
            motor_low: 100,
            min_speed: 70,
            max_speed: 180,
            scaling_factor: 0.8,
            filter_out: 20,
            no_wall_distance: 255,
        }
    }
}

impl WallFollowerConfig {
    /// Configure from a parameter map
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), ConfigError> {
        for (key, slot) in [
            ("band_center", &mut self.band_center),
            ("bandwidth", &mut self.bandwidth),
            ("motor_high", &mut self.motor_high),
            ("motor_low", &mut self.motor_low),
            ("min_speed", &mut self.min_speed),
            ("max_speed", &mut self.max_speed),
            ("filter_out", &mut self.filter_out),
            ("no_wall_distance", &mut self.no_wall_distance),
        ] {
            if let Some(&value) = params.get(key) {
                *slot = non_negative(key, value)? as u32;
            }
        }
        if let Some(&scaling_factor) = params.get("scaling_factor") {
            self.scaling_factor = scaling_factor;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("scaling_factor", self.scaling_factor)?;
        if self.min_speed > self.max_speed {
            return Err(ConfigError::invalid("min_speed", "must not exceed max_speed"));
        }
        if self.band_center >= self.no_wall_distance {
            return Err(ConfigError::invalid(
                "band_center",
                "must be below no_wall_distance",
            ));
        }
        Ok(())
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub geometry: GeometryConfig,
    pub localizer: LocalizerConfig,
    pub navigator: NavigatorConfig,
    pub wall_follower: WallFollowerConfig,
}

impl RobotConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RobotConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate()?;
        self.localizer.validate()?;
        self.navigator.validate()?;
        self.wall_follower.validate()
    }
}

fn finite(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::invalid(key, "must be finite"))
    }
}

fn positive(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if finite(key, value)? > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::invalid(key, format!("must be positive, got {value}")))
    }
}

fn non_negative(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if finite(key, value)? >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::invalid(key, format!("must not be negative, got {value}")))
    }
}
