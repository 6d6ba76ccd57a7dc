//! Echo canceller pipeline
//!
//! [`EchoCanceller`] runs linear removal, residual suppression and peak
//! normalization over a complete pair of buffers. It holds only immutable
//! per-rate state (windows and FFT plans), so one instance can serve any
//! number of calls, concurrently if needed.

use tracing::{debug, info, warn};

use crate::config::CancellerConfig;
use crate::diagnostics::ImpulseExport;
use crate::error::Result;
use crate::processing::{normalize_peak, ImpulseEstimator, ResidualSuppressor};
use crate::types::{CancellationReport, DelayEstimate, Sample};
use crate::utils::{validate_buffers, validate_sample_rate};

/// Batch acoustic echo canceller for one sample rate
#[derive(Debug)]
pub struct EchoCanceller {
    sample_rate: u32,
    config: CancellerConfig,
    estimator: ImpulseEstimator,
    suppressor: ResidualSuppressor,
}

impl EchoCanceller {
    /// Create a canceller for `sample_rate` with the given configuration
    pub fn new(sample_rate: u32, config: CancellerConfig) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        config.validate()?;

        let estimator = ImpulseEstimator::new(sample_rate, &config)?;
        let suppressor = ResidualSuppressor::new(sample_rate, &config)?;

        debug!(
            "Echo canceller ready: {}Hz, impulse chunk {}, suppression chunk {}, strength {}",
            sample_rate,
            estimator.chunk_samples(),
            suppressor.chunk_samples(),
            config.strength
        );

        Ok(Self {
            sample_rate,
            config,
            estimator,
            suppressor,
        })
    }

    /// Create a canceller with the default configuration
    pub fn with_defaults(sample_rate: u32) -> Result<Self> {
        Self::new(sample_rate, CancellerConfig::default())
    }

    /// Start building a canceller
    pub fn builder() -> CancellerBuilder {
        CancellerBuilder::new()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &CancellerConfig {
        &self.config
    }

    /// Remove the echo of `reference` from `mic` in place and return the
    /// estimated delay (positive when the mic lags the reference).
    ///
    /// Both buffers must be recorded at this canceller's sample rate; use
    /// [`validate_sample_rates`](crate::utils::validate_sample_rates) when
    /// that is not known.
    pub fn cancel(&self, reference: &[Sample], mic: &mut [Sample]) -> Result<DelayEstimate> {
        self.cancel_with_report(reference, mic, None)
            .map(|report| report.delay)
    }

    /// Like [`cancel`](Self::cancel), returning everything the pass
    /// measured and optionally exporting the impulse response
    pub fn cancel_with_report(
        &self,
        reference: &[Sample],
        mic: &mut [Sample],
        export: Option<ImpulseExport<'_>>,
    ) -> Result<CancellationReport> {
        validate_buffers(reference, mic)?;

        let reference: Vec<f64> = reference.iter().map(|&s| f64::from(s)).collect();
        let mut processed: Vec<f64> = mic.iter().map(|&s| f64::from(s)).collect();

        let report = self.run(&reference, &mut processed, export);

        for (out, &value) in mic.iter_mut().zip(&processed) {
            *out = value as Sample;
        }
        Ok(report)
    }

    /// Run the pipeline on `f64` buffers
    pub fn cancel_f64(
        &self,
        reference: &[f64],
        mic: &mut [f64],
        export: Option<ImpulseExport<'_>>,
    ) -> Result<CancellationReport> {
        validate_buffers(reference, mic)?;
        Ok(self.run(reference, mic, export))
    }

    /// The pipeline proper; callers have already checked the buffers
    fn run(
        &self,
        reference: &[f64],
        mic: &mut [f64],
        export: Option<ImpulseExport<'_>>,
    ) -> CancellationReport {
        let removal = self.estimator.process(reference, mic);
        let delay = DelayEstimate::new(removal.shift_samples, self.sample_rate);

        let impulse_exported = match (&removal.impulse, export) {
            (Some(impulse), Some(export)) => {
                match export.sink.record(export.id, &impulse.magnitudes()) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Failed to export impulse response '{}': {}", export.id, e);
                        false
                    }
                }
            }
            _ => false,
        };

        let suppression = self.suppressor.process(reference, mic);

        let normalization = if self.config.normalize {
            Some(normalize_peak(mic))
        } else {
            None
        };

        info!(
            "Echo cancelled: delay {}, {} linear frames, {} suppression frames",
            delay, removal.frames, suppression.frames
        );

        CancellationReport {
            delay,
            linear_frames: removal.frames,
            suppression_frames: suppression.frames,
            impulse_peak: removal
                .impulse
                .as_ref()
                .map_or(0.0, |impulse| impulse.peak_magnitude()),
            mean_suppression_gain: suppression.mean_gain,
            normalization,
            impulse_exported,
        }
    }
}

/// Builder for creating echo cancellers
#[derive(Debug, Clone)]
pub struct CancellerBuilder {
    config: CancellerConfig,
    sample_rate: u32,
}

impl CancellerBuilder {
    /// Create a builder with the default configuration at 44.1 kHz
    pub fn new() -> Self {
        Self {
            config: CancellerConfig::default(),
            sample_rate: 44100,
        }
    }

    /// Set the sample rate shared by reference and mic
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: CancellerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the impulse estimator frame length
    pub fn with_impulse_ms(mut self, impulse_ms: f64) -> Self {
        self.config.impulse_ms = impulse_ms;
        self
    }

    /// Set how much impulse content before the peak is kept
    pub fn with_limit_pre_delay_ms(mut self, limit_pre_delay_ms: f64) -> Self {
        self.config.limit_pre_delay_ms = limit_pre_delay_ms;
        self
    }

    /// Set the residual suppressor frame length
    pub fn with_subtraction_ms(mut self, subtraction_ms: f64) -> Self {
        self.config.subtraction_ms = subtraction_ms;
        self
    }

    /// Set residual suppression strength (0 to 1)
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.config.strength = strength;
        self
    }

    /// Enable or disable peak normalization
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    /// Enable or disable parallel frame transforms
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Build the canceller
    pub fn build(self) -> Result<EchoCanceller> {
        EchoCanceller::new(self.sample_rate, self.config)
    }
}

impl Default for CancellerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancel echo with the default configuration
pub fn cancel_echo(
    reference: &[Sample],
    mic: &mut [Sample],
    sample_rate: u32,
) -> Result<DelayEstimate> {
    EchoCanceller::with_defaults(sample_rate)?.cancel(reference, mic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{ImpulseSink, MemoryImpulseSink};
    use crate::error::EchoError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn test_signal(len: usize) -> Vec<Sample> {
        let mut rng = StdRng::seed_from_u64(42);
        (0..len).map(|_| rng.gen_range(-0.5..0.5)).collect()
    }

    #[test]
    fn test_builder() {
        let canceller = EchoCanceller::builder()
            .with_sample_rate(8000)
            .with_strength(0.25)
            .with_impulse_ms(500.0)
            .with_normalize(false)
            .with_parallel(false)
            .build()
            .unwrap();

        assert_eq!(canceller.sample_rate(), 8000);
        assert_eq!(canceller.config().strength, 0.25);
        assert!(!canceller.config().normalize);
        assert_eq!(canceller.estimator.chunk_samples(), 4000);
        assert_eq!(canceller.suppressor.chunk_samples(), 800);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            EchoCanceller::with_defaults(0),
            Err(EchoError::InvalidSampleRate { rate: 0 })
        ));
        assert!(matches!(
            EchoCanceller::builder().with_strength(-0.1).build(),
            Err(EchoError::InvalidConfig { .. })
        ));
        assert!(matches!(
            EchoCanceller::builder().with_sample_rate(8000).with_subtraction_ms(0.1).build(),
            Err(EchoError::ChunkTooSmall { .. })
        ));

        // Oversized frames are rejected before any transform is planned
        assert!(matches!(
            EchoCanceller::builder().with_impulse_ms(1e300).build(),
            Err(EchoError::InvalidConfig { .. })
        ));
        assert!(matches!(
            EchoCanceller::builder().with_limit_pre_delay_ms(1e300).build(),
            Err(EchoError::InvalidConfig { .. })
        ));
        assert!(matches!(
            EchoCanceller::builder().with_sample_rate(u32::MAX).build(),
            Err(EchoError::ChunkTooLarge { .. })
        ));
    }

    #[test]
    fn test_empty_buffers_rejected() {
        let canceller = EchoCanceller::with_defaults(8000).unwrap();
        let mut mic = vec![0.0; 10];
        assert!(matches!(
            canceller.cancel(&[], &mut mic),
            Err(EchoError::EmptyBuffer { buffer: "reference" })
        ));
        assert!(matches!(
            canceller.cancel(&[0.5; 10], &mut []),
            Err(EchoError::EmptyBuffer { buffer: "mic" })
        ));
        assert!(matches!(
            canceller.cancel_f64(&[0.5; 10], &mut [], None),
            Err(EchoError::EmptyBuffer { buffer: "mic" })
        ));
    }

    #[test]
    fn test_report_and_export() {
        let canceller = EchoCanceller::builder()
            .with_sample_rate(4000)
            .with_parallel(false)
            .build()
            .unwrap();
        let reference = test_signal(12000);
        let mut mic: Vec<Sample> = std::iter::repeat(0.0)
            .take(25)
            .chain(reference.iter().map(|s| s * 0.5))
            .take(12000)
            .collect();

        let sink = MemoryImpulseSink::new();
        let report = canceller
            .cancel_with_report(&reference, &mut mic, Some(ImpulseExport::new("probe", &sink)))
            .unwrap();

        assert!(report.has_estimate());
        assert_eq!(report.delay.samples, 25);
        assert_eq!(report.linear_frames, 9);
        assert_eq!(report.suppression_frames, 117);
        assert!(report.impulse_exported);
        assert!(report.impulse_peak > 0.0);

        let magnitudes = sink.get("probe").unwrap();
        assert_eq!(magnitudes.len(), 4000);
        assert!((magnitudes[25] - report.impulse_peak).abs() < 1e-12);
    }

    struct FailingSink;

    impl ImpulseSink for FailingSink {
        fn record(&self, _id: &str, _magnitudes: &[f64]) -> Result<()> {
            Err(EchoError::sink_error("disk full"))
        }
    }

    #[test]
    fn test_failing_sink_does_not_fail_pass() {
        let canceller = EchoCanceller::with_defaults(2000).unwrap();
        let reference = test_signal(4000);
        let mut mic = reference.clone();

        let report = canceller
            .cancel_with_report(&reference, &mut mic, Some(ImpulseExport::new("x", &FailingSink)))
            .unwrap();
        assert!(!report.impulse_exported);
        assert!(report.has_estimate());
    }

    #[test]
    fn test_short_input_report() {
        let canceller = EchoCanceller::with_defaults(8000).unwrap();
        let reference = test_signal(100);
        let mut mic = test_signal(100);

        let sink = MemoryImpulseSink::new();
        let report = canceller
            .cancel_with_report(&reference, &mut mic, Some(ImpulseExport::new("short", &sink)))
            .unwrap();
        assert!(!report.has_estimate());
        assert_eq!(report.delay.samples, 0);
        assert_eq!(report.suppression_frames, 0);
        assert!(!report.impulse_exported);
        assert!(sink.is_empty());
        assert!(report.normalization.unwrap().applied);
    }

    #[test]
    fn test_cancel_echo_helper() {
        let reference = test_signal(8000);
        let mut mic = vec![0.0; 8000];
        let delay = cancel_echo(&reference, &mut mic, 4000).unwrap();
        assert_eq!(delay.samples, 0);
        assert!(mic.iter().all(|s| s.abs() < 1e-6));
    }
}
