//! Simulated light and range sensors

use super::SimWorld;
use crate::common::fix_deg_angle;
use crate::error::SensorError;
use crate::perception::sensors::{LineSensor, RangeSensor};

/// Replays the world's reflectance trace
#[derive(Debug, Clone)]
pub struct SimLineSensor {
    world: SimWorld,
}

impl SimLineSensor {
    pub(super) fn new(world: SimWorld) -> Self {
        SimLineSensor { world }
    }
}

impl LineSensor for SimLineSensor {
    fn fetch_sample(&mut self) -> Result<f64, SensorError> {
        let mut state = self.world.lock();
        state.sync_odometry();
        state.line_reads += 1;
        let Some(sample) = state.line_trace.pop_front() else {
            return Ok(state.floor);
        };
        if let Some(heading) = sample.heading {
            state.pose.theta = fix_deg_angle(heading);
        }
        Ok(sample.reflectance)
    }
}

/// Replays the world's range trace
#[derive(Debug, Clone)]
pub struct SimRangeSensor {
    world: SimWorld,
}

impl SimRangeSensor {
    pub(super) fn new(world: SimWorld) -> Self {
        SimRangeSensor { world }
    }
}

impl RangeSensor for SimRangeSensor {
    fn fetch_distance(&mut self) -> Result<u32, SensorError> {
        let mut state = self.world.lock();
        let no_echo = state.no_echo;
        Ok(state.range_trace.pop_front().unwrap_or(no_echo))
    }
}
