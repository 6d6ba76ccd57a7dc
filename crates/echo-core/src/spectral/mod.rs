//! Spectral frame engine
//!
//! Windowed, 4x-overlapped STFT frames over a pair of buffers and the
//! matching overlap-add synthesis. Each processing stage builds its own
//! engine with its own chunk size.

pub mod frames;
pub mod window;

pub use frames::{FrameEngine, FrameOffsets, FramePair};
pub use window::analysis_window;

/// Number of frames transformed per batch.
///
/// Batches bound the number of live spectra; within a batch frames are
/// transformed concurrently when `parallel` is set.
pub fn batch_len(parallel: bool) -> usize {
    if parallel {
        (rayon::current_num_threads() * 2).max(1)
    } else {
        1
    }
}
