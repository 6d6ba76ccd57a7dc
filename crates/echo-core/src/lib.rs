//! # Echo-Core: Batch Acoustic Echo Cancellation
//!
//! Removes the echo of a played-out reference signal from a microphone
//! recording and estimates the echo path delay. Processing is STFT based and
//! works on complete buffers:
//!
//! 1. **Linear removal**: the echo path's impulse response is estimated by
//!    frequency-domain cross-correlation, cropped around its delay peak and
//!    subtracted frame by frame; the result is shifted to line up with the
//!    reference.
//! 2. **Residual suppression**: short-frame spectral subtraction of any
//!    energy still correlated with the reference.
//! 3. **Normalization**: the processed buffer is peak-scaled to 1.0.
//!
//! ## Usage
//!
//! ```rust
//! use echo_core::EchoCanceller;
//!
//! let canceller = EchoCanceller::builder()
//!     .with_sample_rate(8000)
//!     .with_strength(0.5)
//!     .build()?;
//!
//! let reference: Vec<f32> = (0..16000).map(|i| ((i * 7919) % 101) as f32 / 101.0 - 0.5).collect();
//! let mut mic: Vec<f32> = reference.iter().map(|s| s * 0.3).collect();
//!
//! let delay = canceller.cancel(&reference, &mut mic)?;
//! println!("echo delay: {}", delay);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Delays are positive when the mic lags the reference. Reference and mic
//! must share a sample rate; see [`validate_sample_rates`].

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod canceller;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod processing;
pub mod spectral;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use canceller::{cancel_echo, CancellerBuilder, EchoCanceller};
pub use config::CancellerConfig;
pub use diagnostics::{FileImpulseSink, ImpulseExport, ImpulseSink, MemoryImpulseSink};
pub use error::{EchoError, Result};
pub use types::{CancellationReport, DelayEstimate, Sample};
pub use utils::validate_sample_rates;

/// Version information for the echo canceller library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for the library
///
/// Installs a `tracing_subscriber` formatter unless a global subscriber is
/// already set, so calling it more than once is harmless.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    tracing::info!("Echo-Core v{} initialized", VERSION);
    tracing::debug!("Rayon worker threads: {}", rayon::current_num_threads());

    Ok(())
}
