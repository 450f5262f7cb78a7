//! Simulated odometer

use super::SimWorld;
use crate::common::{fix_deg_angle, Pose};
use crate::perception::sensors::Odometer;

/// Pose store backed by the simulated wheel tachometers
#[derive(Debug, Clone)]
pub struct SimOdometer {
    world: SimWorld,
}

impl SimOdometer {
    pub(super) fn new(world: SimWorld) -> Self {
        SimOdometer { world }
    }
}

impl Odometer for SimOdometer {
    fn pose(&self) -> Pose {
        self.world.pose()
    }

    fn set_position(&mut self, values: [f64; 3], update: [bool; 3]) {
        let mut state = self.world.lock();
        state.sync_odometry();
        if update[0] {
            state.pose.x = values[0];
        }
        if update[1] {
            state.pose.y = values[1];
        }
        if update[2] {
            state.pose.theta = fix_deg_angle(values[2]);
        }
    }

    fn wheel_radius(&self) -> f64 {
        self.world.lock().geometry.wheel_radius
    }

    fn track_width(&self) -> f64 {
        self.world.lock().geometry.track_width
    }
}
