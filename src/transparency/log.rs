//! In-memory transparency log.
//!
//! Counts what the capture pipeline has processed so a host can show the
//! user exactly how much input was observed. Nothing here is written to disk.

use crate::collector::types::SampleSource;
use crate::core::extractor::Modality;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing counters for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of key samples processed
    key_samples: AtomicU64,
    /// Number of pointer samples processed
    pointer_samples: AtomicU64,
    /// Number of touch samples processed
    touch_samples: AtomicU64,
    /// Number of navigation samples processed
    navigation_samples: AtomicU64,
    /// Samples ignored because their source is disabled
    samples_ignored: AtomicU64,
    /// Patterns emitted per modality
    keystroke_patterns: AtomicU64,
    pointer_patterns: AtomicU64,
    navigation_patterns: AtomicU64,
    /// Overall fingerprints generated
    fingerprints_generated: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            key_samples: AtomicU64::new(0),
            pointer_samples: AtomicU64::new(0),
            touch_samples: AtomicU64::new(0),
            navigation_samples: AtomicU64::new(0),
            samples_ignored: AtomicU64::new(0),
            keystroke_patterns: AtomicU64::new(0),
            pointer_patterns: AtomicU64::new(0),
            navigation_patterns: AtomicU64::new(0),
            fingerprints_generated: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Record a processed sample.
    pub fn record_sample(&self, source: SampleSource) {
        let counter = match source {
            SampleSource::Keyboard => &self.key_samples,
            SampleSource::Pointer => &self.pointer_samples,
            SampleSource::Touch => &self.touch_samples,
            SampleSource::Navigation => &self.navigation_samples,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sample dropped by source filtering.
    pub fn record_ignored_sample(&self) {
        self.samples_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an emitted pattern.
    pub fn record_pattern(&self, modality: Modality) {
        let counter = match modality {
            Modality::Keystroke => &self.keystroke_patterns,
            Modality::Pointer => &self.pointer_patterns,
            Modality::Navigation => &self.navigation_patterns,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a generated overall fingerprint.
    pub fn record_fingerprint(&self) {
        self.fingerprints_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        let keystroke_patterns = self.keystroke_patterns.load(Ordering::Relaxed);
        let pointer_patterns = self.pointer_patterns.load(Ordering::Relaxed);
        let navigation_patterns = self.navigation_patterns.load(Ordering::Relaxed);

        TransparencyStats {
            key_samples: self.key_samples.load(Ordering::Relaxed),
            pointer_samples: self.pointer_samples.load(Ordering::Relaxed),
            touch_samples: self.touch_samples.load(Ordering::Relaxed),
            navigation_samples: self.navigation_samples.load(Ordering::Relaxed),
            samples_ignored: self.samples_ignored.load(Ordering::Relaxed),
            keystroke_patterns,
            pointer_patterns,
            navigation_patterns,
            patterns_emitted: keystroke_patterns + pointer_patterns + navigation_patterns,
            fingerprints_generated: self.fingerprints_generated.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Key samples processed: {}\n\
             - Pointer samples processed: {}\n\
             - Touch samples processed: {}\n\
             - Navigation samples processed: {}\n\
             - Samples ignored (source disabled): {}\n\
             - Patterns emitted: {} (keystroke {}, pointer {}, navigation {})\n\
             - Fingerprints generated: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Disclaimer:\n\
             - Samples are held in memory only\n\
             - Fingerprints are not cryptographic",
            stats.key_samples,
            stats.pointer_samples,
            stats.touch_samples,
            stats.navigation_samples,
            stats.samples_ignored,
            stats.patterns_emitted,
            stats.keystroke_patterns,
            stats.pointer_patterns,
            stats.navigation_patterns,
            stats.fingerprints_generated,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.key_samples,
            &self.pointer_samples,
            &self.touch_samples,
            &self.navigation_samples,
            &self.samples_ignored,
            &self.keystroke_patterns,
            &self.pointer_patterns,
            &self.navigation_patterns,
            &self.fingerprints_generated,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub key_samples: u64,
    pub pointer_samples: u64,
    pub touch_samples: u64,
    pub navigation_samples: u64,
    pub samples_ignored: u64,
    pub keystroke_patterns: u64,
    pub pointer_patterns: u64,
    pub navigation_patterns: u64,
    pub patterns_emitted: u64,
    pub fingerprints_generated: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparency_log_counting() {
        let log = TransparencyLog::new();

        log.record_sample(SampleSource::Keyboard);
        log.record_sample(SampleSource::Keyboard);
        log.record_sample(SampleSource::Pointer);
        log.record_pattern(Modality::Navigation);
        log.record_pattern(Modality::Keystroke);

        let stats = log.stats();
        assert_eq!(stats.key_samples, 2);
        assert_eq!(stats.pointer_samples, 1);
        assert_eq!(stats.patterns_emitted, 2);
        assert_eq!(stats.navigation_patterns, 1);
    }

    #[test]
    fn test_transparency_log_reset() {
        let log = TransparencyLog::new();

        log.record_sample(SampleSource::Touch);
        log.record_ignored_sample();
        log.record_fingerprint();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.touch_samples, 0);
        assert_eq!(stats.samples_ignored, 0);
        assert_eq!(stats.fingerprints_generated, 0);
    }

    #[test]
    fn test_summary_format() {
        let log = TransparencyLog::new();
        let summary = log.summary();

        assert!(summary.contains("Key samples"));
        assert!(summary.contains("Pointer samples"));
        assert!(summary.contains("Disclaimer"));
        assert!(summary.contains("not cryptographic"));
    }
}
