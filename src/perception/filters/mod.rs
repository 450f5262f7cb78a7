//! Filtering algorithms for sensor data

/// A generic filter interface
pub trait Filter<T> {
    /// Filter the input data, returning `None` when the sample is dropped
    fn filter(&mut self, input: T) -> Option<T>;
}

/// Drops out-of-range readings until they persist
///
/// A reading at or above `threshold` is discarded while fewer than `window`
/// consecutive such readings have been seen; after that it is passed through.
/// Any in-range reading resets the count.
#[derive(Debug, Clone)]
pub struct DropoutFilter {
    threshold: u32,
    window: u32,
    consecutive: u32,
}

impl DropoutFilter {
    /// Create a new dropout filter
    pub fn new(threshold: u32, window: u32) -> Self {
        DropoutFilter {
            threshold,
            window,
            consecutive: 0,
        }
    }

    /// Number of consecutive out-of-range readings dropped so far
    pub fn dropped(&self) -> u32 {
        self.consecutive
    }
}

impl Filter<u32> for DropoutFilter {
    fn filter(&mut self, input: u32) -> Option<u32> {
        if input < self.threshold {
            self.consecutive = 0;
            return Some(input);
        }
        if self.consecutive < self.window {
            self.consecutive += 1;
            None
        } else {
            Some(input)
        }
    }
}

/// Arithmetic mean of a batch of samples
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}
