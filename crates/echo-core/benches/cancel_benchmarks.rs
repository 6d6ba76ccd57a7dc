//! Performance benchmarks for the echo canceller
//!
//! Full cancellation passes over synthetic signals, plus the individual
//! stages, with and without parallel frame transforms.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use echo_core::processing::{ImpulseEstimator, ResidualSuppressor};
use echo_core::{CancellerConfig, EchoCanceller, Sample};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn noise(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-0.5..0.5)).collect()
}

/// Reference plus a mic carrying its echo 20 ms late
fn echo_pair(sample_rate: u32, seconds: usize) -> (Vec<f64>, Vec<f64>) {
    let len = sample_rate as usize * seconds;
    let delay = sample_rate as usize / 50;
    let reference = noise(len, 1);
    let near_end = noise(len, 2);
    let mic = (0..len)
        .map(|i| {
            let echo = if i >= delay { reference[i - delay] * 0.3 } else { 0.0 };
            echo + near_end[i] * 0.05
        })
        .collect();
    (reference, mic)
}

/// Benchmark a full cancellation pass
fn benchmark_full_cancellation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel");
    group.sample_size(10);

    for &sample_rate in &[16000u32, 48000] {
        let (reference, mic) = echo_pair(sample_rate, 5);
        let reference: Vec<Sample> = reference.iter().map(|&s| s as Sample).collect();
        let mic: Vec<Sample> = mic.iter().map(|&s| s as Sample).collect();

        for parallel in [false, true] {
            let canceller = EchoCanceller::builder()
                .with_sample_rate(sample_rate)
                .with_parallel(parallel)
                .build()
                .unwrap();
            let label = if parallel { "parallel" } else { "serial" };

            group.bench_with_input(BenchmarkId::new(label, sample_rate), &sample_rate, |b, _| {
                b.iter(|| {
                    let mut processed = mic.clone();
                    let delay = canceller.cancel(&reference, &mut processed).unwrap();
                    black_box((delay, processed));
                });
            });
        }
    }

    group.finish();
}

/// Benchmark the linear and residual stages separately
fn benchmark_stages(c: &mut Criterion) {
    let sample_rate = 16000;
    let (reference, mic) = echo_pair(sample_rate, 5);
    let config = CancellerConfig::default();
    let estimator = ImpulseEstimator::new(sample_rate, &config).unwrap();
    let suppressor = ResidualSuppressor::new(sample_rate, &config).unwrap();

    let mut group = c.benchmark_group("stages");
    group.sample_size(10);

    group.bench_function("impulse_estimation", |b| {
        b.iter(|| {
            let mut processed = mic.clone();
            black_box(estimator.process(&reference, &mut processed));
        });
    });

    group.bench_function("residual_suppression", |b| {
        b.iter(|| {
            let mut processed = mic.clone();
            black_box(suppressor.process(&reference, &mut processed));
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_full_cancellation, benchmark_stages);

criterion_main!(benches);
