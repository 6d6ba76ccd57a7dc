//! Input validation utilities for echo cancellation

use crate::error::{EchoError, Result};

/// Smallest chunk that still yields a non-zero 4x overlap step
pub const MIN_CHUNK_SAMPLES: usize = 4;

/// Largest analysis chunk accepted (about 10 s at 384 kHz)
pub const MAX_CHUNK_SAMPLES: usize = 1 << 22;

/// Longest duration parameter accepted, in milliseconds
pub const MAX_DURATION_MS: f64 = 10_000.0;

/// Validate a sample rate in Hz
pub fn validate_sample_rate(rate: u32) -> Result<()> {
    if rate == 0 {
        return Err(EchoError::InvalidSampleRate { rate });
    }

    Ok(())
}

/// Check that reference and mic were captured at the same rate.
///
/// The canceller itself assumes equal rates and never re-checks them; hosts
/// decoding two independent files should call this before cancelling.
pub fn validate_sample_rates(reference: u32, mic: u32) -> Result<()> {
    validate_sample_rate(reference)?;
    validate_sample_rate(mic)?;

    if reference != mic {
        return Err(EchoError::SampleRateMismatch { reference, mic });
    }

    Ok(())
}

/// Validate the reference and mic buffers handed to the canceller
pub fn validate_buffers<T>(reference: &[T], mic: &[T]) -> Result<()> {
    if reference.is_empty() {
        return Err(EchoError::empty_buffer("reference"));
    }
    if mic.is_empty() {
        return Err(EchoError::empty_buffer("mic"));
    }

    Ok(())
}

/// Validate residual suppression strength (0 disables, 1 is full gain reduction)
pub fn validate_strength(strength: f64) -> Result<()> {
    if !strength.is_finite() || !(0.0..=1.0).contains(&strength) {
        return Err(EchoError::invalid_config(format!(
            "strength must be within [0, 1], got {}",
            strength
        )));
    }

    Ok(())
}

/// Validate a duration parameter in milliseconds
pub fn validate_duration_ms(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=MAX_DURATION_MS).contains(&value) {
        return Err(EchoError::invalid_config(format!(
            "{} must be within [0, {}] milliseconds, got {}",
            name, MAX_DURATION_MS, value
        )));
    }

    Ok(())
}

/// Number of samples covering `duration_ms` at `sample_rate`, rounded to nearest
pub fn chunk_len(sample_rate: u32, duration_ms: f64) -> usize {
    (sample_rate as f64 * duration_ms * 0.001).round() as usize
}

/// Validate that a chunk can be split into four overlapping steps and is
/// small enough to plan a transform for
pub fn validate_chunk(chunk_samples: usize) -> Result<()> {
    if chunk_samples < MIN_CHUNK_SAMPLES {
        return Err(EchoError::ChunkTooSmall {
            chunk_samples,
            minimum: MIN_CHUNK_SAMPLES,
        });
    }
    if chunk_samples > MAX_CHUNK_SAMPLES {
        return Err(EchoError::ChunkTooLarge {
            chunk_samples,
            maximum: MAX_CHUNK_SAMPLES,
        });
    }

    Ok(())
}
