//! Residual echo suppression
//!
//! Spectral subtraction over short frames. For each bin pair the stage keeps
//! a running least-squares fit of mic energy against reference energy and
//! removes `strength` times the fitted share, keeping the mic phase.

use tracing::{debug, warn};

use crate::config::{CancellerConfig, DIVISION_EPSILON};
use crate::error::Result;
use crate::spectral::{batch_len, FrameEngine, FramePair};
use crate::utils::validation::validate_strength;

/// Result of the suppression stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Suppression {
    /// Frames processed (0 when skipped or the input is too short)
    pub frames: usize,
    /// Mean amplitude gain applied across all processed bin pairs (1.0 when nothing ran)
    pub mean_gain: f64,
}

impl Suppression {
    fn untouched() -> Self {
        Self {
            frames: 0,
            mean_gain: 1.0,
        }
    }
}

/// Call-scoped per-bin accumulators
struct BinStatistics {
    cross: Vec<f64>,
    energy: Vec<f64>,
    gain_sum: f64,
    gain_count: usize,
}

impl BinStatistics {
    fn new(half: usize) -> Self {
        Self {
            cross: vec![0.0; half],
            energy: vec![0.0; half],
            gain_sum: 0.0,
            gain_count: 0,
        }
    }

    /// Update the running fit with one frame and scale its mic bins
    fn suppress_frame(&mut self, pair: &mut FramePair, strength: f64) {
        let chunk = pair.mic.len();

        for i in 1..chunk / 2 {
            let mirror = chunk - i;
            let ref_energy = pair.reference[i].norm_sqr() + pair.reference[mirror].norm_sqr();
            let mic_energy = pair.mic[i].norm_sqr() + pair.mic[mirror].norm_sqr();

            self.cross[i] += mic_energy * ref_energy;
            self.energy[i] += ref_energy * ref_energy;

            let energy_factor = self.cross[i] / (self.energy[i] + DIVISION_EPSILON);
            let subtracted = (mic_energy - strength * energy_factor * ref_energy).max(0.0);
            let amp_factor = (subtracted / (mic_energy + DIVISION_EPSILON)).sqrt();

            pair.mic[i] *= amp_factor;
            pair.mic[mirror] *= amp_factor;

            self.gain_sum += amp_factor;
            self.gain_count += 1;
        }
    }

    fn mean_gain(&self) -> f64 {
        if self.gain_count == 0 {
            1.0
        } else {
            self.gain_sum / self.gain_count as f64
        }
    }
}

/// Residual suppressor stage
#[derive(Debug)]
pub struct ResidualSuppressor {
    engine: FrameEngine,
    strength: f64,
    parallel: bool,
}

impl ResidualSuppressor {
    /// Create a suppressor for `sample_rate` using the frame length and
    /// strength from `config`
    pub fn new(sample_rate: u32, config: &CancellerConfig) -> Result<Self> {
        validate_strength(config.strength)?;
        let engine = FrameEngine::new(config.subtraction_chunk(sample_rate))?;

        Ok(Self {
            engine,
            strength: config.strength,
            parallel: config.parallel,
        })
    }

    /// Frame length in samples
    pub fn chunk_samples(&self) -> usize {
        self.engine.chunk_samples()
    }

    /// Configured suppression strength
    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Suppress energy in `mic` still correlated with `reference`, in place.
    ///
    /// Only the first `min(reference.len(), mic.len())` samples are
    /// rewritten. With zero strength, or fewer samples than one chunk, `mic`
    /// is left untouched.
    pub fn process(&self, reference: &[f64], mic: &mut [f64]) -> Suppression {
        if self.strength == 0.0 {
            debug!("Suppression strength is 0, skipping residual suppression");
            return Suppression::untouched();
        }

        let shared_length = reference.len().min(mic.len());
        let offsets: Vec<usize> = self.engine.frame_offsets(shared_length).collect();

        if offsets.is_empty() {
            warn!(
                "Input too short for residual suppression ({} samples, chunk {}), passing mic through",
                shared_length,
                self.engine.chunk_samples()
            );
            return Suppression::untouched();
        }

        let mut statistics = BinStatistics::new(self.engine.chunk_samples() / 2);
        let mut output = vec![0.0; shared_length];

        for batch in offsets.chunks(batch_len(self.parallel)) {
            let mut pairs = self.engine.analyze_pairs(reference, mic, batch, self.parallel);
            // Running statistics make each frame depend on all earlier ones
            for pair in pairs.iter_mut() {
                statistics.suppress_frame(pair, self.strength);
            }
            self.engine.synthesize_pairs(&mut pairs, &mut output, self.parallel);
        }

        mic[..shared_length].copy_from_slice(&output);

        let suppression = Suppression {
            frames: offsets.len(),
            mean_gain: statistics.mean_gain(),
        };
        debug!(
            "Residual suppression done: {} frames, mean gain {:.3}",
            suppression.frames, suppression.mean_gain
        );
        suppression
    }
}
