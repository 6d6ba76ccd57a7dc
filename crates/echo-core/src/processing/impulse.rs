//! Linear echo removal
//!
//! Estimates the echo path's transfer function by frequency-domain
//! cross-correlation over every frame of the call, locates the delay peak
//! of its impulse response, crops implausible pre-delay content, then
//! subtracts the predicted echo frame by frame and rebuilds the mic buffer
//! by overlap-add, shifted so it lines up with the reference.

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::config::{CancellerConfig, DIVISION_EPSILON};
use crate::error::Result;
use crate::spectral::{batch_len, FrameEngine};

/// Time-domain impulse response of the estimated echo path
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    taps: Vec<Complex64>,
    peak_index: i64,
    peak_magnitude: f64,
}

impl ImpulseResponse {
    /// Circularly indexed taps, after pre-delay cropping
    pub fn taps(&self) -> &[Complex64] {
        &self.taps
    }

    /// Number of taps (the estimator's chunk length)
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Signed position of the strongest tap, in `(-len/2, len/2]`
    pub fn peak_index(&self) -> i64 {
        self.peak_index
    }

    /// Magnitude of the strongest tap
    pub fn peak_magnitude(&self) -> f64 {
        self.peak_magnitude
    }

    /// `|tap|` for every tap, in circular index order
    pub fn magnitudes(&self) -> Vec<f64> {
        self.taps.iter().map(|tap| tap.norm()).collect()
    }
}

/// Result of the linear removal stage
#[derive(Debug, Clone)]
pub struct LinearRemoval {
    /// Estimated delay; positive when the mic lags the reference
    pub shift_samples: i64,
    /// Frames analysed per pass (0 when the input is shorter than one chunk)
    pub frames: usize,
    /// The cropped impulse response, absent when no frame was analysed
    pub impulse: Option<ImpulseResponse>,
}

/// Impulse estimator and linear subtractor
#[derive(Debug)]
pub struct ImpulseEstimator {
    engine: FrameEngine,
    crop_before: i64,
    parallel: bool,
}

impl ImpulseEstimator {
    /// Create an estimator for `sample_rate` using the frame and crop
    /// lengths from `config`
    pub fn new(sample_rate: u32, config: &CancellerConfig) -> Result<Self> {
        let engine = FrameEngine::new(config.impulse_chunk(sample_rate))?;

        Ok(Self {
            engine,
            crop_before: config.crop_before(sample_rate),
            parallel: config.parallel,
        })
    }

    /// Frame length in samples
    pub fn chunk_samples(&self) -> usize {
        self.engine.chunk_samples()
    }

    /// Remove the linear echo of `reference` from `mic`, in place.
    ///
    /// Every mic sample is rewritten: `mic[i] = output[i + shift]`, or 0 where
    /// that index falls outside the analysed range. When the shared length
    /// is shorter than one chunk nothing can be estimated; `mic` is left
    /// untouched and the shift is 0.
    pub fn process(&self, reference: &[f64], mic: &mut [f64]) -> LinearRemoval {
        let shared_length = reference.len().min(mic.len());
        let offsets: Vec<usize> = self.engine.frame_offsets(shared_length).collect();

        if offsets.is_empty() {
            warn!(
                "Input too short for impulse estimation ({} samples, chunk {}), passing mic through",
                shared_length,
                self.engine.chunk_samples()
            );
            return LinearRemoval {
                shift_samples: 0,
                frames: 0,
                impulse: None,
            };
        }

        debug!(
            "Estimating impulse over {} frames (chunk {}, step {})",
            offsets.len(),
            self.engine.chunk_samples(),
            self.engine.chunk_step()
        );

        let impulse = self.estimate_impulse(reference, mic, &offsets);
        let shift_samples = impulse.peak_index;

        let mut impulse_spectrum = impulse.taps.clone();
        self.engine.forward(&mut impulse_spectrum);

        let output = self.subtract_echo(reference, mic, &offsets, &impulse_spectrum, shared_length);
        apply_shift(mic, &output, shift_samples);

        debug!(
            "Linear removal done: shift {} samples, impulse peak {:.4}",
            shift_samples, impulse.peak_magnitude
        );

        LinearRemoval {
            shift_samples,
            frames: offsets.len(),
            impulse: Some(impulse),
        }
    }

    /// Pass 1: accumulate the cross spectrum and reference energy, derive
    /// the impulse response, locate its peak and crop pre-delay content
    fn estimate_impulse(&self, reference: &[f64], mic: &[f64], offsets: &[usize]) -> ImpulseResponse {
        let chunk = self.engine.chunk_samples();
        let mut cross_sum = vec![Complex64::new(0.0, 0.0); chunk];
        let mut speaker_energy = vec![0.0f64; chunk];

        for batch in offsets.chunks(batch_len(self.parallel)) {
            for pair in self.engine.analyze_pairs(reference, mic, batch, self.parallel) {
                for (((cross, energy), m), r) in cross_sum
                    .iter_mut()
                    .zip(speaker_energy.iter_mut())
                    .zip(&pair.mic)
                    .zip(&pair.reference)
                {
                    *cross += *m * r.conj();
                    *energy += r.norm_sqr();
                }
            }
        }

        let mut taps: Vec<Complex64> = cross_sum
            .iter()
            .zip(&speaker_energy)
            .map(|(&cross, &energy)| cross / (energy + DIVISION_EPSILON))
            .collect();
        self.engine.inverse(&mut taps);
        let scale = chunk as f64;
        for tap in taps.iter_mut() {
            *tap /= scale;
        }

        let (peak_index, peak_magnitude) = find_peak(&taps);
        crop_pre_delay(&mut taps, peak_index, self.crop_before);

        ImpulseResponse {
            taps,
            peak_index,
            peak_magnitude,
        }
    }

    /// Pass 2: subtract the predicted echo from every mic frame and
    /// overlap-add the residual
    fn subtract_echo(
        &self,
        reference: &[f64],
        mic: &[f64],
        offsets: &[usize],
        impulse_spectrum: &[Complex64],
        shared_length: usize,
    ) -> Vec<f64> {
        let mut output = vec![0.0; shared_length];

        for batch in offsets.chunks(batch_len(self.parallel)) {
            let mut pairs = self.engine.analyze_pairs(reference, mic, batch, self.parallel);
            for pair in pairs.iter_mut() {
                for ((m, r), h) in pair.mic.iter_mut().zip(&pair.reference).zip(impulse_spectrum) {
                    *m -= *h * *r;
                }
            }
            self.engine.synthesize_pairs(&mut pairs, &mut output, self.parallel);
        }

        output
    }
}

/// First index of maximum magnitude, mapped into `(-len/2, len/2]`
fn find_peak(taps: &[Complex64]) -> (i64, f64) {
    let mut peak_index = 0usize;
    let mut peak_magnitude = 0.0f64;
    for (i, tap) in taps.iter().enumerate() {
        let magnitude = tap.norm();
        if magnitude > peak_magnitude {
            peak_magnitude = magnitude;
            peak_index = i;
        }
    }

    let len = taps.len() as i64;
    let mut peak = peak_index as i64;
    if peak > len / 2 {
        peak -= len;
    }
    (peak, peak_magnitude)
}

/// Zero every tap whose circular distance from the peak, wrapped into
/// `[-len/2, len/2]`, is below `crop_before`
fn crop_pre_delay(taps: &mut [Complex64], peak_index: i64, crop_before: i64) {
    let len = taps.len() as i64;
    let mid_point = len / 2;

    for (i, tap) in taps.iter_mut().enumerate() {
        let mut distance = i as i64 - peak_index;
        if distance < -mid_point {
            distance += len;
        }
        if distance > mid_point {
            distance -= len;
        }
        if distance < crop_before {
            *tap = Complex64::new(0.0, 0.0);
        }
    }
}

/// `mic[i] = output[i + shift]` where in range, otherwise 0
fn apply_shift(mic: &mut [f64], output: &[f64], shift: i64) {
    for (i, sample) in mic.iter_mut().enumerate() {
        *sample = usize::try_from(i as i64 + shift)
            .ok()
            .and_then(|source| output.get(source))
            .copied()
            .unwrap_or(0.0);
    }
}
