//! Simulated wheel motor

use super::{DriveCommand, SimWorld, Wheel, WheelMode};
use crate::control::Motor;
use crate::error::DriveError;

/// Handle to one simulated wheel
#[derive(Debug, Clone)]
pub struct SimMotor {
    world: SimWorld,
    wheel: Wheel,
}

impl SimMotor {
    pub(super) fn new(world: SimWorld, wheel: Wheel) -> Self {
        SimMotor { world, wheel }
    }

    pub fn wheel(&self) -> Wheel {
        self.wheel
    }

    fn set_mode(&mut self, mode: WheelMode, command: DriveCommand) {
        let mut state = self.world.lock();
        state.wheel_mut(self.wheel).mode = mode;
        state.commands.push(command);
    }
}

impl Motor for SimMotor {
    fn set_speed(&mut self, speed: f64) -> Result<(), DriveError> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(DriveError::CommandRejected {
                wheel: self.wheel.name(),
                reason: format!("invalid speed {speed}"),
            });
        }
        let mut state = self.world.lock();
        state.wheel_mut(self.wheel).speed = speed;
        state.commands.push(DriveCommand::SetSpeed(self.wheel, speed));
        Ok(())
    }

    fn forward(&mut self) -> Result<(), DriveError> {
        self.set_mode(WheelMode::Forward, DriveCommand::Forward(self.wheel));
        Ok(())
    }

    fn backward(&mut self) -> Result<(), DriveError> {
        self.set_mode(WheelMode::Backward, DriveCommand::Backward(self.wheel));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DriveError> {
        self.set_mode(WheelMode::Stopped, DriveCommand::Stop(self.wheel));
        Ok(())
    }

    async fn rotate(&mut self, degrees: f64) -> Result<(), DriveError> {
        {
            let mut state = self.world.lock();
            state.commands.push(DriveCommand::Rotate(self.wheel, degrees));
            let wheel = state.wheel_mut(self.wheel);
            if wheel.stalled {
                return Err(DriveError::Stalled {
                    wheel: self.wheel.name(),
                });
            }
            wheel.tacho += degrees;
        }
        // Let the other wheel's command start before this one reports completion
        tokio::task::yield_now().await;
        self.world.lock().sync_odometry();
        Ok(())
    }
}
