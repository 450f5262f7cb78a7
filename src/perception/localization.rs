//! Light-sensor localization against a floor grid
//!
//! The robot starts in the quadrant below and left of a grid intersection,
//! roughly facing +y. It drives onto the first line, turns onto the second,
//! parks with its centre near the intersection and spins in place. The light
//! sensor sits `sensor_dist` from the centre of rotation, so it sweeps across
//! both lines twice; the four headings at which it does so fix the position
//! and heading relative to the intersection.

use std::fmt;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use super::line::{calibrate, Calibration, LineDetector};
use super::sensors::{read_checked, LineSensor, Odometer};
use crate::common::{fix_deg_angle, Pose};
use crate::config::LocalizerConfig;
use crate::control::{DifferentialDrive, Motor};
use crate::error::LocalizationError;
use crate::navigation::Navigator;
use crate::CancelToken;

/// Number of line crossings captured by the scan
pub const CROSSINGS: usize = 4;

/// Stage of a localization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizationPhase {
    /// Heading reset and sensor calibration.
    Init,
    /// Driving forward onto the first line.
    SeekLine1,
    /// Centring over the first line and turning onto the second.
    OffsetAndTurn1,
    /// Driving forward onto the second line.
    SeekLine2,
    /// Centring over the intersection and starting the spin.
    OffsetAndTurn2,
    /// Spinning and recording the four crossing headings.
    ScanCrossings,
    /// Computing and committing the corrected pose.
    Correction,
    /// Driving to the origin on the corrected pose.
    Navigate,
    /// Run finished.
    Done,
}

impl LocalizationPhase {
    /// Get a short description of the phase.
    pub fn name(&self) -> &'static str {
        match self {
            LocalizationPhase::Init => "Init",
            LocalizationPhase::SeekLine1 => "SeekLine1",
            LocalizationPhase::OffsetAndTurn1 => "OffsetAndTurn1",
            LocalizationPhase::SeekLine2 => "SeekLine2",
            LocalizationPhase::OffsetAndTurn2 => "OffsetAndTurn2",
            LocalizationPhase::ScanCrossings => "ScanCrossings",
            LocalizationPhase::Correction => "Correction",
            LocalizationPhase::Navigate => "Navigate",
            LocalizationPhase::Done => "Done",
        }
    }
}

impl fmt::Display for LocalizationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Headings captured at each line crossing, in capture order
///
/// Index 0..3 are the +x, +y, -x and -y crossings relative to the heading the
/// scan started from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossingRecord {
    angles: [f64; CROSSINGS],
    len: usize,
}

impl CrossingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a heading; returns `false` once all four are captured
    pub fn record(&mut self, theta: f64) -> bool {
        if self.len == CROSSINGS {
            return false;
        }
        self.angles[self.len] = theta;
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_complete(&self) -> bool {
        self.len == CROSSINGS
    }

    /// All four headings, once the record is complete
    pub fn angles(&self) -> Option<[f64; CROSSINGS]> {
        self.is_complete().then_some(self.angles)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.angles[..self.len]
    }
}

/// Pose implied by four crossing headings
///
/// `current_theta` is the odometer heading once the spin has stopped;
/// `heading_reference` is the empirical 176° tunable.
pub fn compute_correction(
    angles: &[f64; CROSSINGS],
    current_theta: f64,
    sensor_dist: f64,
    heading_reference: f64,
) -> Pose {
    let theta_x = angles[2] - angles[0];
    let theta_y = angles[3] - angles[1];

    let x = -sensor_dist * (theta_x / 2.0).to_radians().sin();
    let y = -sensor_dist * (theta_y / 2.0).to_radians().sin();
    let theta = fix_deg_angle(heading_reference - angles[0] + current_theta);

    Pose::new(x, y, theta)
}

/// Summary of a completed localization run
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizationReport {
    pub calibration: Calibration,
    pub crossing_angles: [f64; CROSSINGS],
    /// Pose committed to the odometer
    pub corrected_pose: Pose,
    /// Odometer pose when the run ended, after any navigation
    pub final_pose: Pose,
}

type CrossingCue = Box<dyn FnMut(LocalizationPhase) + Send>;

/// Localizes the robot from floor grid lines with a light sensor
pub struct LightLocalizer<L, R, S, O, N> {
    config: LocalizerConfig,
    drive: DifferentialDrive<L, R>,
    sensor: S,
    odometer: O,
    navigator: N,
    cancel: CancelToken,
    phase: LocalizationPhase,
    navigating: bool,
    crossing_cue: Option<CrossingCue>,
}

impl<L, R, S, O, N> LightLocalizer<L, R, S, O, N>
where
    L: Motor,
    R: Motor,
    S: LineSensor,
    O: Odometer,
    N: Navigator,
{
    /// Create a new localizer
    pub fn new(
        config: LocalizerConfig,
        drive: DifferentialDrive<L, R>,
        sensor: S,
        odometer: O,
        navigator: N,
    ) -> Self {
        LightLocalizer {
            config,
            drive,
            sensor,
            odometer,
            navigator,
            cancel: CancelToken::new(),
            phase: LocalizationPhase::Init,
            navigating: false,
            crossing_cue: None,
        }
    }

    /// Stop the run at its next wait when `cancel` fires
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Call `cue` on every detected line, e.g. to beep
    pub fn with_crossing_cue<F>(mut self, cue: F) -> Self
    where
        F: FnMut(LocalizationPhase) + Send + 'static,
    {
        self.crossing_cue = Some(Box::new(cue));
        self
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    pub fn phase(&self) -> LocalizationPhase {
        self.phase
    }

    /// Whether the wheels are currently commanded to move
    pub fn is_navigating(&self) -> bool {
        self.navigating
    }

    pub fn odometer(&self) -> &O {
        &self.odometer
    }

    /// Run the full localization routine
    ///
    /// On failure the wheels are halted. Failures before the correction
    /// phase leave the odometer position untouched.
    pub async fn do_localization(&mut self) -> Result<LocalizationReport, LocalizationError> {
        let result = self.run().await;
        if let Err(err) = &result {
            log::warn!("Localization failed during {}: {}", self.phase, err);
            if let Err(halt_err) = self.drive.halt().await {
                log::warn!("Failed to halt after localization failure: {}", halt_err);
            }
            self.navigating = false;
        }
        result
    }

    async fn run(&mut self) -> Result<LocalizationReport, LocalizationError> {
        self.enter(LocalizationPhase::Init);
        self.odometer.set_theta(self.config.initial_theta);
        self.settle(self.config.init_settle()).await?;
        let calibration = calibrate(&mut self.sensor, &self.config, &self.cancel).await?;
        let detector = LineDetector::new(calibration.baseline, self.config.line_buffer);

        let radius = self.odometer.wheel_radius();
        let width = self.odometer.track_width();
        let sensor_dist = self.config.sensor_dist;

        self.enter(LocalizationPhase::SeekLine1);
        self.drive.set_speed(self.config.forward_speed)?;
        self.seek_line(&detector).await?;

        self.enter(LocalizationPhase::OffsetAndTurn1);
        self.drive.move_distance(radius, sensor_dist).await?;
        self.drive.rotate_in_place(radius, width, -90.0).await?;

        self.enter(LocalizationPhase::SeekLine2);
        self.seek_line(&detector).await?;

        self.enter(LocalizationPhase::OffsetAndTurn2);
        self.drive.move_distance(radius, sensor_dist).await?;
        self.drive.set_speed(self.config.rotation_speed)?;
        self.drive.spin_counter_clockwise()?;
        self.navigating = true;

        self.enter(LocalizationPhase::ScanCrossings);
        let record = self.scan_crossings(&detector).await?;

        self.enter(LocalizationPhase::Correction);
        self.stop_motors().await?;
        let angles = record.angles().ok_or(LocalizationError::IncompleteScan {
            captured: record.len(),
        })?;
        let corrected_pose = compute_correction(
            &angles,
            self.odometer.theta(),
            sensor_dist,
            self.config.heading_reference,
        );
        self.odometer.set_position(
            [corrected_pose.x, corrected_pose.y, corrected_pose.theta],
            [true, true, true],
        );
        log::info!("Corrected pose {} from crossings {:?}", corrected_pose, angles);

        if self.config.return_to_origin {
            self.enter(LocalizationPhase::Navigate);
            self.navigator.travel_to(0.0, 0.0).await?;
            self.navigator.turn_to(0.0, true).await?;
        }

        self.enter(LocalizationPhase::Done);
        Ok(LocalizationReport {
            calibration,
            crossing_angles: angles,
            corrected_pose,
            final_pose: self.odometer.pose(),
        })
    }

    fn enter(&mut self, phase: LocalizationPhase) {
        log::info!("Localization phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    async fn settle(&mut self, duration: Duration) -> Result<(), LocalizationError> {
        let phase = self.phase;
        self.cancel
            .sleep(duration)
            .await
            .map_err(|_| LocalizationError::Interrupted { phase })
    }

    async fn stop_motors(&mut self) -> Result<(), LocalizationError> {
        self.drive.halt().await?;
        self.navigating = false;
        Ok(())
    }

    /// Drive forward until a line passes under the sensor, then stop
    async fn seek_line(&mut self, detector: &LineDetector) -> Result<(), LocalizationError> {
        self.drive.forward()?;
        self.navigating = true;
        let timeout = self.config.seek_timeout();
        self.wait_for_crossing(detector, Instant::now() + timeout, timeout)
            .await?;
        self.stop_motors().await
    }

    /// Record the heading at each of the four crossings of a full spin
    async fn scan_crossings(
        &mut self,
        detector: &LineDetector,
    ) -> Result<CrossingRecord, LocalizationError> {
        let timeout = self.config.scan_timeout();
        let deadline = Instant::now() + timeout;
        let mut record = CrossingRecord::new();

        while !record.is_complete() {
            self.wait_for_crossing(detector, deadline, timeout).await?;
            let theta = self.odometer.theta();
            record.record(theta);
            log::debug!("Crossing {} recorded at {:.1}°", record.len(), theta);
            self.settle(self.config.crossing_debounce()).await?;
        }
        Ok(record)
    }

    /// Poll the sensor until it reports a line, the deadline passes or the run is cancelled
    async fn wait_for_crossing(
        &mut self,
        detector: &LineDetector,
        deadline: Instant,
        budget: Duration,
    ) -> Result<f64, LocalizationError> {
        let phase = self.phase;
        let interval = self.config.poll_interval();
        let cancel = self.cancel.clone();

        let sample = tokio::select! {
            polled = tokio::time::timeout_at(deadline, poll_for_line(&mut self.sensor, detector, interval)) => {
                match polled {
                    Ok(sample) => sample?,
                    Err(_) => {
                        return Err(LocalizationError::SensorTimeout {
                            phase,
                            waited: budget,
                        })
                    }
                }
            }
            _ = cancel.cancelled() => return Err(LocalizationError::Interrupted { phase }),
        };

        log::debug!(
            "Line detected during {}: sample {:.3} below {:.3}",
            phase,
            sample,
            detector.threshold()
        );
        if let Some(cue) = self.crossing_cue.as_mut() {
            cue(phase);
        }
        Ok(sample)
    }
}

async fn poll_for_line<S: LineSensor>(
    sensor: &mut S,
    detector: &LineDetector,
    interval: Duration,
) -> Result<f64, LocalizationError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let sample = read_checked(sensor)?;
        if detector.is_line_crossing(sample) {
            return Ok(sample);
        }
    }
}
