//! Floor-line detection against a calibrated reflectance baseline

use super::filters::mean;
use super::sensors::{read_checked, LineSensor};
use crate::config::LocalizerConfig;
use crate::error::LocalizationError;
use crate::perception::localization::LocalizationPhase;
use crate::CancelToken;

/// Decides whether a reflectance sample lies on a grid line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDetector {
    baseline: f64,
    buffer: f64,
}

impl LineDetector {
    pub fn new(baseline: f64, buffer: f64) -> Self {
        LineDetector { baseline, buffer }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Samples strictly below this value are lines
    pub fn threshold(&self) -> f64 {
        self.baseline - self.buffer
    }

    pub fn is_line_crossing(&self, sample: f64) -> bool {
        sample < self.threshold()
    }
}

/// Outcome of a successful calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Mean open-floor reflectance
    pub baseline: f64,
    /// Batches sampled, including the accepted one
    pub attempts: u32,
}

/// Derive the open-floor baseline from batches of samples
///
/// A batch mean below `min_baseline` means the sensor sat on a line; the
/// batch is retaken after `calibration_retry_ms` until
/// `max_calibration_attempts` batches have been tried.
pub async fn calibrate<S: LineSensor + ?Sized>(
    sensor: &mut S,
    config: &LocalizerConfig,
    cancel: &CancelToken,
) -> Result<Calibration, LocalizationError> {
    let batch = config.samples_per_baseline as usize;
    let mut samples = Vec::with_capacity(batch);
    let mut baseline = 0.0;

    for attempt in 1..=config.max_calibration_attempts {
        samples.clear();
        for _ in 0..batch {
            samples.push(read_checked(sensor)?);
        }
        baseline = mean(&samples).unwrap_or(0.0);

        if baseline >= config.min_baseline {
            log::info!("Calibrated floor baseline {:.3} after {} attempt(s)", baseline, attempt);
            return Ok(Calibration {
                baseline,
                attempts: attempt,
            });
        }

        log::warn!(
            "Calibration baseline {:.3} below {:.3}, sensor is likely over a line (attempt {}/{})",
            baseline,
            config.min_baseline,
            attempt,
            config.max_calibration_attempts
        );
        if attempt < config.max_calibration_attempts {
            cancel
                .sleep(config.calibration_retry_delay())
                .await
                .map_err(|_| LocalizationError::Interrupted {
                    phase: LocalizationPhase::Init,
                })?;
        }
    }

    Err(LocalizationError::InvalidCalibration {
        attempts: config.max_calibration_attempts,
        baseline,
    })
}
