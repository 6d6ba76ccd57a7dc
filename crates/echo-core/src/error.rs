//! Error handling for the echo canceller
//!
//! Numeric edge cases (silent bins, silent output, inputs shorter than one
//! analysis chunk) are absorbed by guards inside the processing stages and
//! never surface here. The variants below cover precondition violations
//! that must fail fast, plus I/O from the diagnostic sinks.

#![allow(missing_docs)]

use std::fmt;
use thiserror::Error;

/// Result type alias for echo cancellation operations
pub type Result<T> = std::result::Result<T, EchoError>;

/// Error type for echo cancellation operations
#[derive(Error, Debug)]
pub enum EchoError {
    /// Invalid canceller configuration
    #[error("Invalid canceller configuration: {details}")]
    InvalidConfig { details: String },

    /// A required sample buffer was empty
    #[error("Empty {buffer} buffer: at least one sample is required")]
    EmptyBuffer { buffer: &'static str },

    /// Sample rate is zero or otherwise unusable
    #[error("Invalid sample rate: {rate}Hz")]
    InvalidSampleRate { rate: u32 },

    /// Reference and microphone were recorded at different rates
    #[error("Sample rates don't match: reference {reference}Hz, mic {mic}Hz")]
    SampleRateMismatch { reference: u32, mic: u32 },

    /// Analysis chunk too short to build a 4x overlapped frame
    #[error("Analysis chunk too small: {chunk_samples} samples (minimum {minimum})")]
    ChunkTooSmall { chunk_samples: usize, minimum: usize },

    /// Analysis chunk too long to plan a transform for
    #[error("Analysis chunk too large: {chunk_samples} samples (maximum {maximum})")]
    ChunkTooLarge { chunk_samples: usize, maximum: usize },

    /// Configuration could not be parsed
    #[error("Failed to parse configuration: {reason}")]
    ConfigParse { reason: String },

    /// Diagnostic sink failure
    #[error("Diagnostic sink error: {reason}")]
    SinkError { reason: String },

    /// I/O operation failed
    #[error("I/O operation failed: {reason}")]
    IoError { reason: String },
}

impl EchoError {
    /// Create a new invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    /// Create a new empty buffer error
    pub fn empty_buffer(buffer: &'static str) -> Self {
        Self::EmptyBuffer { buffer }
    }

    /// Create a new diagnostic sink error
    pub fn sink_error(reason: impl Into<String>) -> Self {
        Self::SinkError {
            reason: reason.into(),
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. }
            | Self::ChunkTooSmall { .. }
            | Self::ChunkTooLarge { .. }
            | Self::ConfigParse { .. } => ErrorCategory::Configuration,

            Self::EmptyBuffer { .. }
            | Self::InvalidSampleRate { .. }
            | Self::SampleRateMismatch { .. } => ErrorCategory::Input,

            Self::SinkError { .. } => ErrorCategory::Diagnostics,

            Self::IoError { .. } => ErrorCategory::Io,
        }
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration and parameter errors
    Configuration,
    /// Caller-supplied buffers or rates violate a precondition
    Input,
    /// Optional impulse export failed
    Diagnostics,
    /// I/O related errors
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Input => write!(f, "Input"),
            Self::Diagnostics => write!(f, "Diagnostics"),
            Self::Io => write!(f, "I/O"),
        }
    }
}

/// Convert from I/O errors
impl From<std::io::Error> for EchoError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError {
            reason: error.to_string(),
        }
    }
}

/// Convert from configuration parsing errors
impl From<serde_json::Error> for EchoError {
    fn from(error: serde_json::Error) -> Self {
        Self::ConfigParse {
            reason: error.to_string(),
        }
    }
}
