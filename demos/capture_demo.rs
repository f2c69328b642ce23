//! Demonstration of the CryptoID capture pipeline.
//!
//! This example shows how to:
//! 1. Create an input hub and start an aggregator on it
//! 2. Dispatch a scripted stream of key, pointer and navigation samples
//! 3. Poll the aggregator's read accessors the way a UI would
//! 4. Compare two session fingerprints
//! 5. Build a capture report
//!
//! Run with: cargo run --example capture_demo

use cryptoid_capture::{
    collector::{KeySample, NavigationKind, NavigationSample, PointerSample, RawSample},
    tolerance,
    transparency::create_shared_log,
    CaptureAggregator, Config, InputHub, ReportBuilder, DISCLAIMER,
};
use std::sync::Arc;

fn scripted_session(offset_ms: f64, jitter_ms: f64) -> Vec<RawSample> {
    let mut samples = Vec::new();
    let mut t = offset_ms;

    for (i, key) in "hello world".chars().enumerate() {
        let key = key.to_string();
        samples.push(RawSample::Key(KeySample::down(key.clone(), t)));
        t += 70.0 + (i % 3) as f64 * jitter_ms;
        samples.push(RawSample::Key(KeySample::up(key, t)));
        t += 50.0 + (i % 2) as f64 * jitter_ms;
    }

    for step in 0..12 {
        let x = step as f64 * 12.0;
        let y = step as f64 * 5.0 + (step % 3) as f64 * jitter_ms;
        let sample = if step % 4 == 3 {
            PointerSample::click(x, y, t)
        } else {
            PointerSample::movement(x, y, t)
        };
        samples.push(RawSample::Pointer(sample));
        t += 16.0;
    }

    samples.push(RawSample::Navigation(NavigationSample::new(
        NavigationKind::Scroll,
        t,
    )));
    samples
}

fn run_session(config: &Config, samples: Vec<RawSample>) -> CaptureAggregator {
    let hub = InputHub::new(config.channel_capacity);
    let log = create_shared_log();
    let mut capture = CaptureAggregator::new(config).with_transparency(Arc::clone(&log));

    if let Err(e) = capture.start(&hub) {
        eprintln!("Could not start capture: {e}");
        return capture;
    }

    for (i, sample) in samples.into_iter().enumerate() {
        hub.dispatch(sample);

        // Poll every few samples, the way a UI timer would.
        if i % 8 == 0 {
            capture.pump();
            println!(
                "  patterns: {:>3} | confidence: {:>5.1}%",
                capture.pattern_count(),
                capture.overall_confidence() * 100.0
            );
        }
    }
    capture.pump();
    capture.stop();

    println!();
    println!("{}", log.summary());
    capture
}

fn main() {
    println!("CryptoID Capture - Demo");
    println!("=======================");
    println!("{DISCLAIMER}");

    let config = Config::default();

    println!("Session A:");
    let a = run_session(&config, scripted_session(0.0, 8.0));
    println!();
    println!("Session B (same rhythm, shifted in time):");
    let b = run_session(&config, scripted_session(10_000.0, 8.0));
    println!();
    println!("Session C (different rhythm):");
    let c = run_session(&config, scripted_session(0.0, 40.0));

    let fa = a.overall_fingerprint();
    let fb = b.overall_fingerprint();
    let fc = c.overall_fingerprint();

    println!();
    println!("Fingerprint A: {fa}");
    println!("Fingerprint B: {fb}");
    println!("Fingerprint C: {fc}");
    println!("Tolerance A/B: {:.3}", tolerance(&fa, &fb));
    println!("Tolerance A/C: {:.3}", tolerance(&fa, &fc));

    println!();
    println!("Report for session A:");
    println!("{}", ReportBuilder::new().build_json(&a));
}
