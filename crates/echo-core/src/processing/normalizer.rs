//! Peak normalization of the processed mic buffer

use tracing::debug;

use crate::config::SILENCE_THRESHOLD;
use crate::utils::peak_abs;

/// Outcome of a normalization pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Peak absolute amplitude before scaling
    pub peak: f64,
    /// Whether the buffer was divided by `peak`
    pub applied: bool,
}

impl Normalization {
    /// Record a measured peak without scaling
    pub fn skipped(peak: f64) -> Self {
        Self { peak, applied: false }
    }
}

/// Scale `samples` so the peak absolute amplitude becomes 1.0.
///
/// Buffers whose peak is at or below [`SILENCE_THRESHOLD`] are left as they
/// are rather than amplifying numerical noise.
pub fn normalize_peak(samples: &mut [f64]) -> Normalization {
    let peak = peak_abs(samples);

    if peak <= SILENCE_THRESHOLD {
        debug!("Output peak {:.3e} below silence threshold, skipping normalization", peak);
        return Normalization::skipped(peak);
    }

    for sample in samples.iter_mut() {
        *sample /= peak;
    }

    Normalization { peak, applied: true }
}
