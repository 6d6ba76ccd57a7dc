//! Windowed STFT frames and overlap-add synthesis

use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use super::window::analysis_window;
use crate::error::Result;
use crate::utils::validation::validate_chunk;

/// Offsets of every complete frame inside a buffer.
///
/// Yields `0, step, 2·step, …` while `offset + chunk ≤ limit`.
#[derive(Debug, Clone)]
pub struct FrameOffsets {
    next: usize,
    chunk: usize,
    step: usize,
    limit: usize,
}

impl Iterator for FrameOffsets {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self.next.checked_add(self.chunk) {
            Some(end) if end <= self.limit => {
                let offset = self.next;
                self.next += self.step;
                Some(offset)
            }
            _ => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next.checked_add(self.chunk) {
            Some(end) if end <= self.limit => (self.limit - end) / self.step + 1,
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameOffsets {}

/// Spectra of the reference and mic frames starting at the same offset
#[derive(Debug, Clone)]
pub struct FramePair {
    /// Frame start in samples
    pub offset: usize,
    /// Forward transform of the windowed reference slice
    pub reference: Vec<Complex64>,
    /// Forward transform of the windowed mic slice
    pub mic: Vec<Complex64>,
}

/// Frame generator for one analysis stage.
///
/// Owns the stage's window and FFT plans. Frames overlap 4x
/// (`chunk_step = chunk_samples / 4`).
pub struct FrameEngine {
    chunk_samples: usize,
    chunk_step: usize,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scratch_len: usize,
}

impl FrameEngine {
    /// Plan transforms and build the window for `chunk_samples` frames
    pub fn new(chunk_samples: usize) -> Result<Self> {
        validate_chunk(chunk_samples)?;

        let chunk_step = chunk_samples / 4;
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(chunk_samples);
        let inverse = planner.plan_fft_inverse(chunk_samples);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Ok(Self {
            chunk_samples,
            chunk_step,
            window: analysis_window(chunk_samples, chunk_step),
            forward,
            inverse,
            scratch_len,
        })
    }

    /// Frame length in samples
    pub fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    /// Hop between frames in samples
    pub fn chunk_step(&self) -> usize {
        self.chunk_step
    }

    /// The analysis/synthesis window
    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// Offsets of all complete frames within `shared_length` samples
    pub fn frame_offsets(&self, shared_length: usize) -> FrameOffsets {
        FrameOffsets {
            next: 0,
            chunk: self.chunk_samples,
            step: self.chunk_step,
            limit: shared_length,
        }
    }

    fn scratch(&self) -> Vec<Complex64> {
        vec![Complex64::new(0.0, 0.0); self.scratch_len]
    }

    /// Unnormalized forward transform of a full-length buffer, in place
    pub fn forward(&self, buffer: &mut [Complex64]) {
        self.forward.process(buffer);
    }

    /// Unnormalized inverse transform of a full-length buffer, in place
    pub fn inverse(&self, buffer: &mut [Complex64]) {
        self.inverse.process(buffer);
    }

    /// Window the frame of `signal` at `offset` and transform it into `spectrum`.
    ///
    /// # Panics
    ///
    /// Panics if the frame runs past the end of `signal`; offsets from
    /// [`frame_offsets`](Self::frame_offsets) never do.
    pub fn analyze_into(
        &self,
        signal: &[f64],
        offset: usize,
        spectrum: &mut [Complex64],
        scratch: &mut [Complex64],
    ) {
        let frame = &signal[offset..offset + self.chunk_samples];
        for ((bin, &sample), &w) in spectrum.iter_mut().zip(frame).zip(&self.window) {
            *bin = Complex64::new(sample * w, 0.0);
        }
        self.forward.process_with_scratch(spectrum, scratch);
    }

    /// Spectrum of the windowed frame of `signal` at `offset`
    pub fn analyze(&self, signal: &[f64], offset: usize) -> Vec<Complex64> {
        let mut spectrum = vec![Complex64::new(0.0, 0.0); self.chunk_samples];
        let mut scratch = self.scratch();
        self.analyze_into(signal, offset, &mut spectrum, &mut scratch);
        spectrum
    }

    /// Analyze the reference and mic frames at each of `offsets`.
    ///
    /// Frames are transformed concurrently when `parallel` is set; the
    /// result is always in offset order.
    pub fn analyze_pairs(
        &self,
        reference: &[f64],
        mic: &[f64],
        offsets: &[usize],
        parallel: bool,
    ) -> Vec<FramePair> {
        let analyze_pair = |scratch: &mut Vec<Complex64>, offset: &usize| {
            let mut reference_spectrum = vec![Complex64::new(0.0, 0.0); self.chunk_samples];
            let mut mic_spectrum = vec![Complex64::new(0.0, 0.0); self.chunk_samples];
            self.analyze_into(reference, *offset, &mut reference_spectrum, scratch);
            self.analyze_into(mic, *offset, &mut mic_spectrum, scratch);
            FramePair {
                offset: *offset,
                reference: reference_spectrum,
                mic: mic_spectrum,
            }
        };

        if parallel {
            offsets
                .par_iter()
                .map_init(|| self.scratch(), analyze_pair)
                .collect()
        } else {
            let mut scratch = self.scratch();
            offsets
                .iter()
                .map(|offset| analyze_pair(&mut scratch, offset))
                .collect()
        }
    }

    /// Inverse-transform `spectrum` in place, then add the normalized,
    /// re-windowed frame into `output` at `offset`
    pub fn synthesize_into(
        &self,
        spectrum: &mut [Complex64],
        output: &mut [f64],
        offset: usize,
        scratch: &mut [Complex64],
    ) {
        self.inverse.process_with_scratch(spectrum, scratch);
        self.overlap_add(spectrum, output, offset);
    }

    fn overlap_add(&self, frame: &[Complex64], output: &mut [f64], offset: usize) {
        let scale = self.chunk_samples as f64;
        let target = &mut output[offset..offset + self.chunk_samples];
        for ((out, bin), &w) in target.iter_mut().zip(frame).zip(&self.window) {
            *out += bin.re / scale * w;
        }
    }

    /// Overlap-add the (modified) mic spectra of `pairs` into `output`.
    ///
    /// Inverse transforms may run concurrently; the accumulation into
    /// `output` is serial and in frame order, because neighbouring frames
    /// write overlapping ranges.
    pub fn synthesize_pairs(&self, pairs: &mut [FramePair], output: &mut [f64], parallel: bool) {
        if parallel {
            pairs
                .par_iter_mut()
                .for_each_init(|| self.scratch(), |scratch, pair| {
                    self.inverse.process_with_scratch(&mut pair.mic, scratch);
                });
        } else {
            let mut scratch = self.scratch();
            for pair in pairs.iter_mut() {
                self.inverse.process_with_scratch(&mut pair.mic, &mut scratch);
            }
        }

        for pair in pairs.iter() {
            self.overlap_add(&pair.mic, output, pair.offset);
        }
    }
}

impl fmt::Debug for FrameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameEngine")
            .field("chunk_samples", &self.chunk_samples)
            .field("chunk_step", &self.chunk_step)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EchoError;

    fn probe_signal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64;
                (t * 0.031).sin() + 0.5 * (t * 0.27).cos() + 0.25 * ((i * 7919) % 13) as f64 / 13.0
            })
            .collect()
    }

    #[test]
    fn test_frame_offsets() {
        let engine = FrameEngine::new(16).unwrap();
        let offsets: Vec<usize> = engine.frame_offsets(40).collect();
        assert_eq!(offsets, vec![0, 4, 8, 12, 16, 20, 24]);
        assert_eq!(engine.frame_offsets(40).len(), 7);

        // Exact fit is included
        assert_eq!(engine.frame_offsets(16).collect::<Vec<_>>(), vec![0]);
        assert_eq!(engine.frame_offsets(15).len(), 0);
        assert_eq!(engine.frame_offsets(0).next(), None);
    }

    #[test]
    fn test_chunk_too_small() {
        assert!(matches!(
            FrameEngine::new(3),
            Err(EchoError::ChunkTooSmall { chunk_samples: 3, .. })
        ));
        assert!(FrameEngine::new(4).is_ok());
    }

    #[test]
    fn test_overlap_add_reconstructs_interior() {
        let engine = FrameEngine::new(64).unwrap();
        assert_eq!(engine.window(), analysis_window(64, 16).as_slice());
        let signal = probe_signal(640);
        let offsets: Vec<usize> = engine.frame_offsets(signal.len()).collect();
        let last = *offsets.last().unwrap();

        let mut output = vec![0.0; signal.len()];
        let mut scratch = engine.scratch();
        for &offset in &offsets {
            let mut spectrum = engine.analyze(&signal, offset);
            engine.synthesize_into(&mut spectrum, &mut output, offset, &mut scratch);
        }

        // Every position covered by four frames is reproduced
        let step = engine.chunk_step();
        for i in 3 * step..last + step {
            assert!(
                (output[i] - signal[i]).abs() < 1e-9,
                "mismatch at {}: {} vs {}",
                i,
                output[i],
                signal[i]
            );
        }
    }

    #[test]
    fn test_parallel_and_serial_frames_match() {
        let engine = FrameEngine::new(128).unwrap();
        let reference = probe_signal(1024);
        let mic: Vec<f64> = reference.iter().map(|s| s * 0.5 + 0.1).collect();
        let offsets: Vec<usize> = engine.frame_offsets(1024).collect();

        let mut serial = engine.analyze_pairs(&reference, &mic, &offsets, false);
        let mut parallel = engine.analyze_pairs(&reference, &mic, &offsets, true);
        assert_eq!(serial.len(), offsets.len());
        for (a, b) in serial.iter().zip(&parallel) {
            assert_eq!(a.offset, b.offset);
            assert_eq!(a.reference, b.reference);
            assert_eq!(a.mic, b.mic);
        }

        let mut serial_out = vec![0.0; 1024];
        let mut parallel_out = vec![0.0; 1024];
        engine.synthesize_pairs(&mut serial, &mut serial_out, false);
        engine.synthesize_pairs(&mut parallel, &mut parallel_out, true);
        assert_eq!(serial_out, parallel_out);
    }

    #[test]
    fn test_forward_inverse_scaling() {
        let engine = FrameEngine::new(32).unwrap();
        let original: Vec<Complex64> = (0..32).map(|i| Complex64::new(i as f64, -(i as f64))).collect();
        let mut buffer = original.clone();
        engine.forward(&mut buffer);
        engine.inverse(&mut buffer);
        for (a, b) in buffer.iter().zip(&original) {
            assert!((*a / 32.0 - *b).norm() < 1e-9);
        }
    }
}
