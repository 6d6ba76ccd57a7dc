//! Canceller configuration

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::validation::{chunk_len, validate_duration_ms, validate_strength};

/// Default impulse-estimation frame length (1 s)
pub const DEFAULT_IMPULSE_MS: f64 = 1000.0;

/// Default pre-delay window kept before the impulse peak (20 ms)
pub const DEFAULT_LIMIT_PRE_DELAY_MS: f64 = 20.0;

/// Default residual-suppression frame length (100 ms)
pub const DEFAULT_SUBTRACTION_MS: f64 = 100.0;

/// Default residual-suppression strength
pub const DEFAULT_STRENGTH: f64 = 0.5;

/// Added to every spectral denominator so silent bins never divide by zero
pub const DIVISION_EPSILON: f64 = 1e-6;

/// Peaks at or below this are treated as silence and left unscaled
pub const SILENCE_THRESHOLD: f64 = 1e-6;

/// Configuration options for the echo canceller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CancellerConfig {
    /// Frame length of the impulse estimator in milliseconds; also bounds
    /// the longest echo path that can be modelled
    pub impulse_ms: f64,

    /// Impulse content earlier than this many milliseconds before the
    /// peak is discarded as an estimation artifact
    pub limit_pre_delay_ms: f64,

    /// Frame length of the residual suppressor in milliseconds
    pub subtraction_ms: f64,

    /// Residual suppression strength (0 disables, 1 applies the full gain reduction)
    pub strength: f64,

    /// Peak-normalize the processed mic buffer
    pub normalize: bool,

    /// Transform frames on the rayon thread pool
    pub parallel: bool,
}

impl Default for CancellerConfig {
    fn default() -> Self {
        Self {
            impulse_ms: DEFAULT_IMPULSE_MS,
            limit_pre_delay_ms: DEFAULT_LIMIT_PRE_DELAY_MS,
            subtraction_ms: DEFAULT_SUBTRACTION_MS,
            strength: DEFAULT_STRENGTH,
            normalize: true,
            parallel: true,
        }
    }
}

impl CancellerConfig {
    /// Check every parameter is in range
    pub fn validate(&self) -> Result<()> {
        validate_duration_ms("impulse_ms", self.impulse_ms)?;
        validate_duration_ms("limit_pre_delay_ms", self.limit_pre_delay_ms)?;
        validate_duration_ms("subtraction_ms", self.subtraction_ms)?;
        validate_strength(self.strength)?;
        Ok(())
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Impulse estimator frame length in samples
    pub fn impulse_chunk(&self, sample_rate: u32) -> usize {
        chunk_len(sample_rate, self.impulse_ms)
    }

    /// Residual suppressor frame length in samples
    pub fn subtraction_chunk(&self, sample_rate: u32) -> usize {
        chunk_len(sample_rate, self.subtraction_ms)
    }

    /// Signed crop boundary relative to the impulse peak (always <= 0)
    pub fn crop_before(&self, sample_rate: u32) -> i64 {
        i64::try_from(chunk_len(sample_rate, self.limit_pre_delay_ms)).map_or(i64::MIN, |n| -n)
    }
}
