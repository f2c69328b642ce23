//! Pattern extraction from rolling windows of raw samples.
//!
//! Each modality has its own path:
//! - keystroke: dwell and flight times over the last few key events
//! - pointer: step velocities and accelerations over the last few pointer events
//! - navigation: a single value per focus or scroll event
//!
//! Extracted values are scored with a naive consistency measure and stamped
//! with a fingerprint.

use crate::collector::types::{KeyPhase, KeySample, NavigationSample, PointerSample};
use crate::config::ExtractorConfig;
use crate::core::cipher::FingerprintEncoder;
use crate::core::clock::SharedClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Lower bound of the confidence score for non-empty input.
pub const MIN_CONFIDENCE: f64 = 0.3;

/// Upper bound of the confidence score.
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Input channel a pattern was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Keystroke,
    Pointer,
    Navigation,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Keystroke => "keystroke",
            Modality::Pointer => "pointer",
            Modality::Navigation => "navigation",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted feature vector with its score and fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub modality: Modality,
    pub values: Vec<f64>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub fingerprint: String,
}

/// Compute dwell times: a down immediately followed by the up of the same key.
pub fn dwell_times(recent: &[KeySample]) -> Vec<f64> {
    recent
        .windows(2)
        .filter(|pair| {
            pair[0].phase == KeyPhase::Down
                && pair[1].phase == KeyPhase::Up
                && pair[0].key == pair[1].key
        })
        .map(|pair| pair[1].timestamp_ms - pair[0].timestamp_ms)
        .collect()
}

/// Compute flight times: an up at `i` and a down at `i + 2`.
pub fn flight_times(recent: &[KeySample]) -> Vec<f64> {
    recent
        .windows(3)
        .filter(|triple| triple[0].phase == KeyPhase::Up && triple[2].phase == KeyPhase::Down)
        .map(|triple| triple[2].timestamp_ms - triple[0].timestamp_ms)
        .collect()
}

/// Compute per-step velocities (distance per millisecond), skipping steps
/// with no elapsed time.
pub fn velocities(recent: &[PointerSample]) -> Vec<f64> {
    recent
        .windows(2)
        .filter_map(|pair| {
            let dt = pair[1].timestamp_ms - pair[0].timestamp_ms;
            if dt > 0.0 {
                Some(pair[0].distance_to(&pair[1]) / dt)
            } else {
                None
            }
        })
        .collect()
}

/// Compute absolute velocity changes between consecutive steps.
pub fn accelerations(velocities: &[f64]) -> Vec<f64> {
    velocities
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .collect()
}

/// Consistency score of a value vector.
///
/// `1 - stdDev/mean` clamped to [0.3, 1.0]; a zero mean counts as a ratio of
/// 0. An empty vector scores 0.
pub fn calculate_confidence(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean = values.iter().mean();
    let std_dev = values.iter().population_std_dev();

    let ratio = std_dev / mean;
    let ratio = if ratio.is_finite() { ratio } else { 0.0 };

    (1.0 - ratio).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// The last `window` items of `buffer`, or `None` if fewer are buffered.
fn recent<T>(buffer: &[T], window: usize) -> Option<&[T]> {
    if window == 0 || buffer.len() < window {
        return None;
    }
    Some(&buffer[buffer.len() - window..])
}

/// Values for the keystroke path, before stamping.
pub fn keystroke_values(buffer: &[KeySample], window: usize) -> Option<Vec<f64>> {
    let recent = recent(buffer, window)?;

    let mut values = dwell_times(recent);
    values.extend(flight_times(recent));

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Values for the pointer path, before stamping.
pub fn pointer_values(buffer: &[PointerSample], window: usize) -> Option<Vec<f64>> {
    let recent = recent(buffer, window)?;

    let mut values = velocities(recent);
    if values.is_empty() {
        return None;
    }
    let accel = accelerations(&values);
    values.extend(accel);

    Some(values)
}

/// Turns buffered samples into stamped [`Pattern`]s.
pub struct PatternExtractor {
    config: ExtractorConfig,
    encoder: FingerprintEncoder,
    clock: SharedClock,
    sequence: u64,
}

impl PatternExtractor {
    pub fn new(config: ExtractorConfig, clock: SharedClock) -> Self {
        Self {
            config,
            encoder: FingerprintEncoder::new(clock.clone()),
            clock,
            sequence: 0,
        }
    }

    pub fn encoder(&self) -> &FingerprintEncoder {
        &self.encoder
    }

    /// Run the keystroke path over a key buffer.
    pub fn keystroke(&mut self, buffer: &[KeySample]) -> Option<Pattern> {
        let values = keystroke_values(buffer, self.config.keystroke_window)?;
        let confidence = calculate_confidence(&values);
        Some(self.stamp(Modality::Keystroke, values, confidence))
    }

    /// Run the pointer path over a pointer buffer.
    pub fn pointer(&mut self, buffer: &[PointerSample]) -> Option<Pattern> {
        let values = pointer_values(buffer, self.config.pointer_window)?;
        let confidence = calculate_confidence(&values);
        Some(self.stamp(Modality::Pointer, values, confidence))
    }

    /// Navigation events always produce a pattern with a fixed confidence.
    pub fn navigation(&mut self, sample: &NavigationSample) -> Pattern {
        let values = vec![sample.timestamp_ms % 1000.0];
        let confidence = self.config.navigation_confidence;
        self.stamp(Modality::Navigation, values, confidence)
    }

    /// Reset the id sequence.
    pub fn reset(&mut self) {
        self.sequence = 0;
    }

    fn stamp(&mut self, modality: Modality, values: Vec<f64>, confidence: f64) -> Pattern {
        let created_at = self.clock.now();
        let id = format!(
            "{}_{}_{}",
            modality,
            created_at.timestamp_millis(),
            self.sequence
        );
        self.sequence += 1;

        let fingerprint = self.encoder.encode(&values);
        tracing::debug!(%id, values = values.len(), confidence, "pattern extracted");

        Pattern {
            id,
            modality,
            values,
            confidence,
            created_at,
            fingerprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::NavigationKind;
    use crate::core::cipher::is_well_formed;
    use crate::core::clock::FixedClock;
    use std::sync::Arc;

    fn extractor() -> PatternExtractor {
        PatternExtractor::new(
            ExtractorConfig::default(),
            Arc::new(FixedClock::at_millis(1_000)),
        )
    }

    #[test]
    fn test_confidence_empty() {
        assert_eq!(calculate_confidence(&[]), 0.0);
    }

    #[test]
    fn test_confidence_uniform_values() {
        assert_eq!(calculate_confidence(&[50.0, 50.0, 50.0]), 1.0);
    }

    #[test]
    fn test_confidence_zero_mean() {
        assert_eq!(calculate_confidence(&[0.0, 0.0]), 1.0);
        assert_eq!(calculate_confidence(&[-1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_confidence_bounds() {
        let inputs: [&[f64]; 5] = [
            &[1.0],
            &[1.0, 1000.0],
            &[0.001, 0.5, 200.0, 3.0],
            &[80.0, 70.0],
            &[-5.0, 1.0, 2.0],
        ];
        for values in inputs {
            let c = calculate_confidence(values);
            assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c), "{values:?} -> {c}");
        }
    }

    #[test]
    fn test_confidence_formula() {
        // mean 75, population std dev 5
        let c = calculate_confidence(&[80.0, 70.0]);
        assert!((c - (1.0 - 5.0 / 75.0)).abs() < 1e-9);
    }

    #[test]
    fn test_keystroke_needs_four_events() {
        let buffer = vec![
            KeySample::down("a", 0.0),
            KeySample::up("a", 80.0),
            KeySample::down("b", 150.0),
        ];
        assert!(keystroke_values(&buffer, 4).is_none());
    }

    #[test]
    fn test_keystroke_dwell_pairs() {
        let buffer = vec![
            KeySample::down("a", 0.0),
            KeySample::up("a", 80.0),
            KeySample::down("b", 150.0),
            KeySample::up("b", 210.0),
        ];
        let values = keystroke_values(&buffer, 4).unwrap();
        // Both keys matched; no up at i followed by a down at i + 2.
        assert_eq!(values, vec![80.0, 60.0]);
    }

    #[test]
    fn test_keystroke_flight_time() {
        let buffer = vec![
            KeySample::down("a", 0.0),
            KeySample::up("a", 80.0),
            KeySample::down("b", 120.0),
            KeySample::down("c", 150.0),
        ];
        let values = keystroke_values(&buffer, 4).unwrap();
        assert_eq!(values, vec![80.0, 70.0]);
    }

    #[test]
    fn test_keystroke_mismatched_keys() {
        let buffer = vec![
            KeySample::down("a", 0.0),
            KeySample::up("b", 10.0),
            KeySample::down("c", 20.0),
            KeySample::up("d", 30.0),
        ];
        assert!(keystroke_values(&buffer, 4).is_none());
    }

    #[test]
    fn test_keystroke_uses_most_recent_window() {
        let buffer = vec![
            KeySample::down("x", 0.0),
            KeySample::up("x", 999.0),
            KeySample::down("a", 1000.0),
            KeySample::up("a", 1040.0),
            KeySample::down("b", 1100.0),
            KeySample::up("b", 1130.0),
        ];
        assert_eq!(keystroke_values(&buffer, 4).unwrap(), vec![40.0, 30.0]);
    }

    #[test]
    fn test_pointer_velocities() {
        let buffer = vec![
            PointerSample::movement(0.0, 0.0, 0.0),
            PointerSample::movement(3.0, 4.0, 10.0),
            PointerSample::movement(3.0, 4.0, 10.0),
            PointerSample::movement(6.0, 8.0, 30.0),
            PointerSample::movement(9.0, 12.0, 50.0),
        ];

        let v = velocities(&buffer);
        assert_eq!(v, vec![0.5, 0.25, 0.25]);

        let values = pointer_values(&buffer, 5).unwrap();
        assert_eq!(values, vec![0.5, 0.25, 0.25, 0.25, 0.0]);
    }

    #[test]
    fn test_pointer_needs_five_events() {
        let buffer = vec![
            PointerSample::movement(0.0, 0.0, 0.0),
            PointerSample::movement(1.0, 0.0, 1.0),
            PointerSample::movement(2.0, 0.0, 2.0),
            PointerSample::click(3.0, 0.0, 3.0),
        ];
        assert!(pointer_values(&buffer, 5).is_none());
    }

    #[test]
    fn test_pointer_without_elapsed_time() {
        let buffer: Vec<PointerSample> = (0..5)
            .map(|i| PointerSample::movement(i as f64, 0.0, 100.0))
            .collect();
        assert!(pointer_values(&buffer, 5).is_none());
    }

    #[test]
    fn test_stamped_patterns() {
        let mut extractor = extractor();
        let buffer = vec![
            KeySample::down("a", 0.0),
            KeySample::up("a", 80.0),
            KeySample::down("b", 150.0),
            KeySample::up("b", 210.0),
        ];

        let first = extractor.keystroke(&buffer).unwrap();
        let second = extractor.keystroke(&buffer).unwrap();

        assert_eq!(first.modality, Modality::Keystroke);
        assert_eq!(first.id, "keystroke_1000_0");
        assert_eq!(second.id, "keystroke_1000_1");
        assert!(is_well_formed(&first.fingerprint));
        assert_eq!(first.fingerprint, second.fingerprint);
        assert!((first.confidence - (1.0 - 10.0 / 70.0)).abs() < 1e-9);
    }

    #[test]
    fn test_navigation_pattern() {
        let mut extractor = extractor();
        let sample = NavigationSample::new(NavigationKind::Scroll, 12_345.5);
        let pattern = extractor.navigation(&sample);

        assert_eq!(pattern.modality, Modality::Navigation);
        assert_eq!(pattern.values, vec![345.5]);
        assert_eq!(pattern.confidence, 0.8);
    }
}
