//! Shared helpers for the processing stages

pub mod validation;

pub use validation::{
    chunk_len, validate_buffers, validate_sample_rate, validate_sample_rates, validate_strength,
};

/// Peak absolute amplitude of a buffer (0 for an empty buffer)
pub fn peak_abs(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0, |peak, &s| peak.max(s.abs()))
}

/// Root-mean-square level of a buffer (0 for an empty buffer)
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_abs() {
        assert_eq!(peak_abs(&[]), 0.0);
        assert_eq!(peak_abs(&[0.25, -0.75, 0.5]), 0.75);
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        let value = rms(&[1.0, -1.0, 1.0, -1.0]);
        assert!((value - 1.0).abs() < 1e-12);
    }
}
