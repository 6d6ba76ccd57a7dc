//! Synthetic Echo Cancellation Demo
//!
//! Builds a far-end signal, simulates a room that plays it back with a delay
//! and two reflections, adds near-end noise, and runs the canceller.
//!
//! Usage: `cargo run --example synthetic_echo_demo [config.json]`

use echo_core::{CancellerConfig, EchoCanceller, MemoryImpulseSink, ImpulseExport, Result, Sample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

const SAMPLE_RATE: u32 = 16000;

fn main() -> Result<()> {
    echo_core::init()?;

    println!("🔇 Batch Echo Cancellation Demo");
    println!("===============================");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            println!("📄 Loading configuration from {}", path);
            CancellerConfig::from_json_str(&std::fs::read_to_string(path)?)?
        }
        None => CancellerConfig::default(),
    };
    println!("🏗️ Configuration: {}", serde_json::to_string(&config)?);

    let canceller = EchoCanceller::new(SAMPLE_RATE, config)?;

    // 4 s of far-end "speech": a warbling tone over noise
    let far_end = create_far_end(SAMPLE_RATE as usize * 4);
    let delay_samples = 400; // 25 ms
    let mut mic = create_room_echo(&far_end, delay_samples);
    let echo_level = level(&mic);
    add_near_end_noise(&mut mic, 0.01);

    println!("\n📢 Simulated room");
    println!("   Direct path delay: {} samples", delay_samples);
    println!("   Echo level: {:.4}", echo_level);

    let sink = MemoryImpulseSink::new();
    let report = canceller.cancel_with_report(&far_end, &mut mic, Some(ImpulseExport::new("demo", &sink)))?;

    println!("\n🎯 Results");
    println!("   Estimated delay: {} ({:+.2} ms)", report.delay, report.delay.as_millis());
    println!("   Linear frames: {}", report.linear_frames);
    println!("   Suppression frames: {}", report.suppression_frames);
    println!("   Impulse peak: {:.4}", report.impulse_peak);
    println!("   Mean suppression gain: {:.3}", report.mean_suppression_gain);
    if let Some(normalization) = report.normalization {
        println!("   Output peak before normalization: {:.5}", normalization.peak);
    }

    if let Some(magnitudes) = sink.get("demo") {
        let mut taps: Vec<(usize, f64)> = magnitudes.into_iter().enumerate().collect();
        taps.sort_by(|a, b| b.1.total_cmp(&a.1));
        println!("\n📈 Strongest impulse taps");
        for (index, magnitude) in taps.iter().take(3) {
            println!("   tap {:5}: {:.4}", index, magnitude);
        }
    }

    println!("\n✅ Demo complete");
    Ok(())
}

fn create_far_end(len: usize) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..len)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let pitch = 300.0 + 80.0 * (2.0 * PI * 3.0 * t).sin();
            0.4 * (2.0 * PI * pitch * t).sin() + rng.gen_range(-0.15..0.15)
        })
        .collect()
}

/// Direct echo plus two weaker reflections
fn create_room_echo(far_end: &[Sample], delay: usize) -> Vec<Sample> {
    let paths = [(delay, 0.35), (delay + 120, 0.12), (delay + 410, 0.05)];
    (0..far_end.len())
        .map(|i| {
            paths
                .iter()
                .filter(|(d, _)| i >= *d)
                .map(|(d, gain)| far_end[i - d] * gain)
                .sum()
        })
        .collect()
}

fn add_near_end_noise(mic: &mut [Sample], amplitude: f32) {
    let mut rng = StdRng::seed_from_u64(11);
    for sample in mic.iter_mut() {
        *sample += rng.gen_range(-amplitude..amplitude);
    }
}

fn level(signal: &[Sample]) -> f32 {
    (signal.iter().map(|s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}
