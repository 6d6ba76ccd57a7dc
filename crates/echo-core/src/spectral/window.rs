//! Analysis/synthesis window
//!
//! The window is applied twice per frame (before the forward transform and
//! again after the inverse), so it is designed so that its *square* sums to
//! one across four frames spaced a quarter chunk apart.

use std::f64::consts::PI;

/// Build the analysis window for `chunk_samples` frames hopped by `chunk_step`.
///
/// `window[i] = s² / sqrt(s⁴ + c⁴) · sqrt(2·step/chunk)` with
/// `s = sin(π·r)`, `c = cos(π·r)` and `r = (i + 0.5) / chunk`.
pub fn analysis_window(chunk_samples: usize, chunk_step: usize) -> Vec<f64> {
    if chunk_samples == 0 {
        return Vec::new();
    }

    let overlap_factor = 2.0 * chunk_step as f64 / chunk_samples as f64;
    let scale = overlap_factor.sqrt();

    (0..chunk_samples)
        .map(|i| {
            let r = (i as f64 + 0.5) / chunk_samples as f64;
            let (s, c) = (PI * r).sin_cos();
            let (s2, c2) = (s * s, c * c);
            s2 / (s2 * s2 + c2 * c2).sqrt() * scale
        })
        .collect()
}
