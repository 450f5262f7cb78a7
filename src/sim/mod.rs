//! Hardware-free scripted robot for tests and dry runs
//!
//! A [`SimWorld`] holds the shared state behind a set of simulated devices:
//!
//! | Device | Behaviour |
//! |--------|-----------|
//! | [`SimMotor`] | `rotate` advances the wheel tachometer; continuous modes only record the command |
//! | [`SimOdometer`] | integrates tachometer deltas with differential-drive kinematics once a rotation completes |
//! | [`SimLineSensor`] | replays a reflectance trace, then reports open floor forever |
//! | [`SimRangeSensor`] | replays a distance trace, then reports no echo forever |
//!
//! The world has no floor geometry. A trace sample may carry the heading the
//! scripted robot has reached when it is read, which is how a spin is
//! simulated: the odometer jumps to that heading before the sample is
//! returned.
//!
//! ```
//! use gridline_core::config::GeometryConfig;
//! use gridline_core::sim::{SimWorld, TraceSample};
//!
//! let world = SimWorld::new(GeometryConfig::default(), 0.5);
//! world.push_line_trace([TraceSample::floor(0.5), TraceSample::line_at(0.1, 0.0)]);
//! assert_eq!(world.remaining_line_samples(), 2);
//! ```

mod motor;
mod odometer;
mod sensor;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use self::motor::SimMotor;
pub use self::odometer::SimOdometer;
pub use self::sensor::{SimLineSensor, SimRangeSensor};

use crate::common::geometry::wheel_arc;
use crate::common::{fix_deg_angle, Pose};
use crate::config::GeometryConfig;
use crate::control::DifferentialDrive;

/// Which side of the chassis a wheel is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    Left,
    Right,
}

impl Wheel {
    pub fn name(&self) -> &'static str {
        match self {
            Wheel::Left => "left",
            Wheel::Right => "right",
        }
    }

    fn index(&self) -> usize {
        match self {
            Wheel::Left => 0,
            Wheel::Right => 1,
        }
    }
}

/// Continuous running mode of a wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WheelMode {
    #[default]
    Stopped,
    Forward,
    Backward,
}

/// Snapshot of a simulated wheel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelState {
    pub speed: f64,
    pub mode: WheelMode,
    /// Accumulated relative rotation in degrees
    pub tacho: f64,
    pub stalled: bool,
}

/// A command received by a simulated motor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    SetSpeed(Wheel, f64),
    Forward(Wheel),
    Backward(Wheel),
    Stop(Wheel),
    Rotate(Wheel, f64),
}

/// One scripted reflectance reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSample {
    pub reflectance: f64,
    /// Heading the robot has reached when this sample is read
    pub heading: Option<f64>,
}

impl TraceSample {
    /// A reading with no heading change
    pub fn floor(reflectance: f64) -> Self {
        TraceSample {
            reflectance,
            heading: None,
        }
    }

    /// A reading taken after the robot has spun to `heading`
    pub fn at(reflectance: f64, heading: f64) -> Self {
        TraceSample {
            reflectance,
            heading: Some(heading),
        }
    }

    /// A dark reading with no heading change
    pub fn line(reflectance: f64) -> Self {
        Self::floor(reflectance)
    }

    /// A dark reading taken at `heading`
    pub fn line_at(reflectance: f64, heading: f64) -> Self {
        Self::at(reflectance, heading)
    }
}

#[derive(Debug)]
struct WorldState {
    geometry: GeometryConfig,
    pose: Pose,
    wheels: [WheelState; 2],
    synced_tacho: [f64; 2],
    line_trace: VecDeque<TraceSample>,
    floor: f64,
    line_reads: usize,
    range_trace: VecDeque<u32>,
    no_echo: u32,
    commands: Vec<DriveCommand>,
}

impl WorldState {
    /// Fold tachometer motion since the last sync into the pose
    fn sync_odometry(&mut self) {
        let radius = self.geometry.wheel_radius;
        let dl = wheel_arc(radius, self.wheels[0].tacho - self.synced_tacho[0]);
        let dr = wheel_arc(radius, self.wheels[1].tacho - self.synced_tacho[1]);
        self.synced_tacho = [self.wheels[0].tacho, self.wheels[1].tacho];
        if dl == 0.0 && dr == 0.0 {
            return;
        }

        let distance = (dl + dr) / 2.0;
        let dtheta = (dr - dl) / self.geometry.track_width;
        let heading = self.pose.theta.to_radians() + dtheta / 2.0;
        self.pose.x += distance * heading.cos();
        self.pose.y += distance * heading.sin();
        self.pose.theta = fix_deg_angle(self.pose.theta + dtheta.to_degrees());
    }

    fn wheel_mut(&mut self, wheel: Wheel) -> &mut WheelState {
        &mut self.wheels[wheel.index()]
    }
}

/// Shared state of a simulated robot
#[derive(Debug, Clone)]
pub struct SimWorld {
    state: Arc<Mutex<WorldState>>,
}

impl SimWorld {
    /// Create a world at the origin, facing +x, over floor of reflectance `floor`
    pub fn new(geometry: GeometryConfig, floor: f64) -> Self {
        SimWorld {
            state: Arc::new(Mutex::new(WorldState {
                geometry,
                pose: Pose::default(),
                wheels: [WheelState::default(); 2],
                synced_tacho: [0.0; 2],
                line_trace: VecDeque::new(),
                floor,
                line_reads: 0,
                range_trace: VecDeque::new(),
                no_echo: 255,
                commands: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place the robot
    pub fn set_pose(&self, pose: Pose) {
        let mut state = self.lock();
        state.sync_odometry();
        state.pose = pose;
    }

    /// Current pose, including any motion not yet read by the odometer
    pub fn pose(&self) -> Pose {
        let mut state = self.lock();
        state.sync_odometry();
        state.pose
    }

    /// Append samples to the reflectance trace
    pub fn push_line_trace(&self, samples: impl IntoIterator<Item = TraceSample>) {
        self.lock().line_trace.extend(samples);
    }

    /// Append readings to the range trace
    pub fn push_range_trace(&self, distances: impl IntoIterator<Item = u32>) {
        self.lock().range_trace.extend(distances);
    }

    /// Reading reported once the range trace runs out
    pub fn set_no_echo(&self, distance: u32) {
        self.lock().no_echo = distance;
    }

    /// Make a wheel fail every subsequent `rotate`
    pub fn set_stalled(&self, wheel: Wheel, stalled: bool) {
        self.lock().wheel_mut(wheel).stalled = stalled;
    }

    pub fn remaining_line_samples(&self) -> usize {
        self.lock().line_trace.len()
    }

    /// Reflectance samples read so far
    pub fn line_reads(&self) -> usize {
        self.lock().line_reads
    }

    pub fn wheel(&self, wheel: Wheel) -> WheelState {
        self.lock().wheels[wheel.index()]
    }

    /// Every motor command received so far, in order
    pub fn commands(&self) -> Vec<DriveCommand> {
        self.lock().commands.clone()
    }

    pub fn motor(&self, wheel: Wheel) -> SimMotor {
        SimMotor::new(self.clone(), wheel)
    }

    /// A drive over fresh handles to both simulated wheels
    pub fn drive(&self) -> DifferentialDrive<SimMotor, SimMotor> {
        DifferentialDrive::new(self.motor(Wheel::Left), self.motor(Wheel::Right))
    }

    pub fn line_sensor(&self) -> SimLineSensor {
        SimLineSensor::new(self.clone())
    }

    pub fn range_sensor(&self) -> SimRangeSensor {
        SimRangeSensor::new(self.clone())
    }

    pub fn odometer(&self) -> SimOdometer {
        SimOdometer::new(self.clone())
    }
}
