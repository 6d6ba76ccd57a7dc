//! Public result types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::processing::Normalization;

/// Audio sample type of the public API (mono, normalized float)
pub type Sample = f32;

/// Estimated echo path delay.
///
/// Positive values mean the mic signal lags the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayEstimate {
    /// Delay in samples
    pub samples: i64,
    /// Sample rate the delay was measured at
    pub sample_rate: u32,
}

impl DelayEstimate {
    /// Create a delay estimate
    pub fn new(samples: i64, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Delay in seconds
    pub fn as_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f64 / f64::from(self.sample_rate)
    }

    /// Delay in milliseconds
    pub fn as_millis(&self) -> f64 {
        self.as_seconds() * 1000.0
    }
}

impl fmt::Display for DelayEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} samples ({:.2} ms)", self.samples, self.as_millis())
    }
}

/// Everything one cancellation pass measured
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationReport {
    /// Estimated echo delay
    pub delay: DelayEstimate,
    /// Frames analysed by the impulse estimator (per pass)
    pub linear_frames: usize,
    /// Frames processed by the residual suppressor
    pub suppression_frames: usize,
    /// Magnitude of the strongest impulse tap (0 without an estimate)
    pub impulse_peak: f64,
    /// Mean amplitude gain of the residual suppressor
    pub mean_suppression_gain: f64,
    /// Outcome of peak normalization, `None` when disabled
    pub normalization: Option<Normalization>,
    /// Whether the impulse response reached the diagnostic sink
    pub impulse_exported: bool,
}

impl CancellationReport {
    /// Whether the input was long enough to estimate the echo path
    pub fn has_estimate(&self) -> bool {
        self.linear_frames > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_conversions() {
        let delay = DelayEstimate::new(441, 44100);
        assert!((delay.as_seconds() - 0.01).abs() < 1e-12);
        assert!((delay.as_millis() - 10.0).abs() < 1e-9);
        assert_eq!(delay.to_string(), "441 samples (10.00 ms)");

        let early = DelayEstimate::new(-80, 8000);
        assert!((early.as_seconds() + 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_delay_serialization() {
        let delay = DelayEstimate::new(500, 48000);
        let json = serde_json::to_string(&delay).unwrap();
        assert_eq!(json, r#"{"samples":500,"sample_rate":48000}"#);
        let back: DelayEstimate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delay);
    }
}
