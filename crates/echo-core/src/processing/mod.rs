//! Processing stages of the echo canceller
//!
//! Stages run in a fixed order: linear removal, residual suppression,
//! normalization. Each works on `f64` buffers and can be used on its own.

pub mod impulse;
pub mod normalizer;
pub mod suppressor;

pub use impulse::{ImpulseEstimator, ImpulseResponse, LinearRemoval};
pub use normalizer::{normalize_peak, Normalization};
pub use suppressor::{ResidualSuppressor, Suppression};
