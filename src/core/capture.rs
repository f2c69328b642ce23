//! Capture aggregation: buffering raw samples and collecting patterns.
//!
//! A [`CaptureAggregator`] is an explicit `Idle -> Capturing -> Idle` state
//! machine. Starting it subscribes to an [`InputHub`]; stopping or resetting
//! drops the subscription, so a session never holds more than one listener.

use crate::collector::hub::{InputHub, Subscription};
use crate::collector::types::{
    KeyPhase, KeySample, NavigationSample, PointerKind, PointerSample, RawSample, SampleSource,
    TouchSample,
};
use crate::config::{Config, SourceConfig};
use crate::core::cipher::FingerprintEncoder;
use crate::core::clock::{system_clock, SharedClock};
use crate::core::extractor::{Modality, Pattern, PatternExtractor};
use crate::transparency::SharedTransparencyLog;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// Errors that can occur when driving an aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    AlreadyCapturing,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::AlreadyCapturing => write!(f, "Capture is already running"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Raw samples buffered per modality. Unbounded until reset.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffers {
    pub keys: Vec<KeySample>,
    pub pointer: Vec<PointerSample>,
    pub touch: Vec<TouchSample>,
    pub navigation: Vec<NavigationSample>,
}

impl SampleBuffers {
    /// Number of buffered samples for a source.
    pub fn len_of(&self, source: SampleSource) -> usize {
        match source {
            SampleSource::Keyboard => self.keys.len(),
            SampleSource::Pointer => self.pointer.len(),
            SampleSource::Touch => self.touch.len(),
            SampleSource::Navigation => self.navigation.len(),
        }
    }

    /// Total buffered samples.
    pub fn total(&self) -> usize {
        self.keys.len() + self.pointer.len() + self.touch.len() + self.navigation.len()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.pointer.clear();
        self.touch.clear();
        self.navigation.clear();
    }
}

/// Arithmetic mean of pattern confidences; 0 when there are none.
pub fn mean_confidence(patterns: &[Pattern]) -> f64 {
    if patterns.is_empty() {
        return 0.0;
    }
    patterns.iter().map(|p| p.confidence).sum::<f64>() / patterns.len() as f64
}

/// Session object that owns sample buffers and the extracted pattern list.
pub struct CaptureAggregator {
    state: CaptureState,
    sources: SourceConfig,
    extractor: PatternExtractor,
    buffers: SampleBuffers,
    patterns: Vec<Pattern>,
    subscription: Option<Subscription>,
    transparency: Option<SharedTransparencyLog>,
}

impl CaptureAggregator {
    /// Create an idle aggregator using the system clock.
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Create an idle aggregator stamping patterns with `clock`.
    pub fn with_clock(config: &Config, clock: SharedClock) -> Self {
        Self {
            state: CaptureState::Idle,
            sources: config.sources.clone(),
            extractor: PatternExtractor::new(config.extractor.clone(), clock),
            buffers: SampleBuffers::default(),
            patterns: Vec::new(),
            subscription: None,
            transparency: None,
        }
    }

    /// Attach a transparency log that counts processed samples and patterns.
    pub fn with_transparency(mut self, log: SharedTransparencyLog) -> Self {
        self.transparency = Some(log);
        self
    }

    /// Begin listening on `hub`.
    ///
    /// Returns [`CaptureError::AlreadyCapturing`] without subscribing again
    /// if the aggregator is already capturing.
    pub fn start(&mut self, hub: &InputHub) -> Result<(), CaptureError> {
        if self.state == CaptureState::Capturing {
            return Err(CaptureError::AlreadyCapturing);
        }

        let subscription = hub.subscribe();
        tracing::debug!(subscription = subscription.id(), "capture started");
        self.subscription = Some(subscription);
        self.state = CaptureState::Capturing;
        Ok(())
    }

    /// Stop listening. Buffers and patterns are kept.
    pub fn stop(&mut self) {
        if self.subscription.take().is_some() {
            tracing::debug!(patterns = self.patterns.len(), "capture stopped");
        }
        self.state = CaptureState::Idle;
    }

    /// Clear all buffers and patterns and stop listening.
    pub fn reset(&mut self) {
        self.stop();
        self.buffers.clear();
        self.patterns.clear();
        self.extractor.reset();
        tracing::debug!("capture reset");
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }

    /// Drain samples queued on the subscription and ingest them.
    ///
    /// Returns the number of patterns produced.
    pub fn pump(&mut self) -> usize {
        let pending: Vec<RawSample> = match &self.subscription {
            Some(subscription) => subscription.receiver().try_iter().collect(),
            None => return 0,
        };

        let mut produced = 0;
        for sample in pending {
            if self.ingest(sample).is_some() {
                produced += 1;
            }
        }
        produced
    }

    /// Buffer one sample and run the matching extractor path.
    ///
    /// Samples are ignored while idle or when their source is disabled.
    /// Key-ups run the keystroke path, clicks run the pointer path, every
    /// navigation sample emits; other samples are only buffered.
    pub fn ingest(&mut self, sample: RawSample) -> Option<&Pattern> {
        if self.state != CaptureState::Capturing {
            return None;
        }

        let source = sample.source();
        if !self.sources.allows(source) {
            if let Some(log) = &self.transparency {
                log.record_ignored_sample();
            }
            return None;
        }
        if let Some(log) = &self.transparency {
            log.record_sample(source);
        }

        let pattern = match sample {
            RawSample::Key(key) => {
                let is_release = key.phase == KeyPhase::Up;
                self.buffers.keys.push(key);
                if is_release {
                    self.extractor.keystroke(&self.buffers.keys)
                } else {
                    None
                }
            }
            RawSample::Pointer(pointer) => {
                let is_click = pointer.kind == PointerKind::Click;
                self.buffers.pointer.push(pointer);
                if is_click {
                    self.extractor.pointer(&self.buffers.pointer)
                } else {
                    None
                }
            }
            RawSample::Touch(touch) => {
                self.buffers.touch.push(touch);
                None
            }
            RawSample::Navigation(nav) => {
                let pattern = self.extractor.navigation(&nav);
                self.buffers.navigation.push(nav);
                Some(pattern)
            }
        }?;

        if let Some(log) = &self.transparency {
            log.record_pattern(pattern.modality);
        }
        self.patterns.push(pattern);
        self.patterns.last()
    }

    /// Patterns in creation order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of patterns of one modality.
    pub fn pattern_count_of(&self, modality: Modality) -> usize {
        self.patterns
            .iter()
            .filter(|p| p.modality == modality)
            .count()
    }

    /// Mean confidence over all patterns; 0 when there are none.
    pub fn overall_confidence(&self) -> f64 {
        mean_confidence(&self.patterns)
    }

    /// Fingerprint of every pattern's values flattened in creation order.
    pub fn overall_fingerprint(&self) -> String {
        let flattened: Vec<f64> = self
            .patterns
            .iter()
            .flat_map(|p| p.values.iter().copied())
            .collect();

        if let Some(log) = &self.transparency {
            log.record_fingerprint();
        }
        self.encoder().encode(&flattened)
    }

    pub fn encoder(&self) -> &FingerprintEncoder {
        self.extractor.encoder()
    }

    pub fn buffers(&self) -> &SampleBuffers {
        &self.buffers
    }

    /// Number of buffered samples for one source.
    pub fn buffered(&self, source: SampleSource) -> usize {
        self.buffers.len_of(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::NavigationKind;
    use crate::core::cipher::{is_fallback, is_well_formed};
    use crate::core::clock::FixedClock;
    use crate::transparency::create_shared_log;
    use chrono::Utc;
    use std::sync::Arc;

    fn aggregator(config: &Config) -> CaptureAggregator {
        CaptureAggregator::with_clock(config, Arc::new(FixedClock::at_millis(5_000)))
    }

    fn pattern_with_confidence(confidence: f64) -> Pattern {
        Pattern {
            id: "p".to_string(),
            modality: Modality::Keystroke,
            values: vec![1.0],
            confidence,
            created_at: Utc::now(),
            fingerprint: "CRID_00_0".to_string(),
        }
    }

    fn typing_samples() -> Vec<RawSample> {
        vec![
            RawSample::Key(KeySample::down("a", 0.0)),
            RawSample::Key(KeySample::up("a", 80.0)),
            RawSample::Key(KeySample::down("b", 150.0)),
            RawSample::Key(KeySample::up("b", 210.0)),
        ]
    }

    #[test]
    fn test_mean_confidence() {
        let patterns = vec![pattern_with_confidence(0.5), pattern_with_confidence(0.9)];
        assert!((mean_confidence(&patterns) - 0.7).abs() < 1e-12);
        assert_eq!(mean_confidence(&[]), 0.0);
    }

    #[test]
    fn test_duplicate_start_rejected() {
        let hub = InputHub::new(16);
        let mut capture = aggregator(&Config::default());

        assert!(capture.start(&hub).is_ok());
        assert_eq!(capture.start(&hub), Err(CaptureError::AlreadyCapturing));
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(capture.state(), CaptureState::Capturing);
        assert!(capture.is_capturing());
    }

    #[test]
    fn test_reset_unsubscribes_and_clears() {
        let hub = InputHub::new(16);
        let mut capture = aggregator(&Config::default());
        capture.start(&hub).unwrap();

        for sample in typing_samples() {
            capture.ingest(sample);
        }
        assert_eq!(capture.pattern_count(), 1);

        capture.reset();
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(capture.pattern_count(), 0);
        assert_eq!(capture.buffers().total(), 0);

        // Restart after reset is allowed.
        assert!(capture.start(&hub).is_ok());
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_idle_ignores_samples() {
        let mut capture = aggregator(&Config::default());
        let nav = RawSample::Navigation(NavigationSample::new(NavigationKind::FocusIn, 10.0));

        assert!(capture.ingest(nav).is_none());
        assert_eq!(capture.buffers().total(), 0);
    }

    #[test]
    fn test_keystroke_end_to_end() {
        let hub = InputHub::new(16);
        let mut capture = aggregator(&Config::default());
        capture.start(&hub).unwrap();

        for sample in typing_samples() {
            hub.dispatch(sample);
        }
        assert_eq!(capture.pump(), 1);

        let patterns = capture.patterns();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].modality, Modality::Keystroke);
        assert_eq!(patterns[0].values, vec![80.0, 60.0]);
        assert!((patterns[0].confidence - (1.0 - 10.0 / 70.0)).abs() < 1e-9);
        assert_eq!(capture.buffered(SampleSource::Keyboard), 4);
    }

    #[test]
    fn test_pointer_runs_on_click() {
        let hub = InputHub::new(16);
        let mut capture = aggregator(&Config::default());
        capture.start(&hub).unwrap();

        let moves = [
            (0.0, 0.0, 0.0),
            (3.0, 4.0, 10.0),
            (3.0, 4.0, 10.0),
            (6.0, 8.0, 30.0),
            (9.0, 12.0, 50.0),
        ];
        for (x, y, t) in moves {
            assert!(capture
                .ingest(RawSample::Pointer(PointerSample::movement(x, y, t)))
                .is_none());
        }

        let pattern = capture
            .ingest(RawSample::Pointer(PointerSample::click(9.0, 12.0, 60.0)))
            .cloned()
            .unwrap();
        // Window is the last five samples: (3,4)@10 twice, (6,8)@30, (9,12)@50, click@60.
        assert_eq!(pattern.modality, Modality::Pointer);
        assert_eq!(pattern.values, vec![0.25, 0.25, 0.0, 0.0, 0.25]);
    }

    #[test]
    fn test_navigation_and_overall_confidence() {
        let mut config = Config::default();
        config.extractor.navigation_confidence = 0.5;
        let hub = InputHub::new(16);
        let mut capture = aggregator(&config);
        capture.start(&hub).unwrap();

        capture.ingest(RawSample::Navigation(NavigationSample::new(
            NavigationKind::Scroll,
            1_250.0,
        )));
        capture.ingest(RawSample::Navigation(NavigationSample::new(
            NavigationKind::FocusOut,
            2_999.0,
        )));

        assert_eq!(capture.pattern_count_of(Modality::Navigation), 2);
        assert_eq!(capture.overall_confidence(), 0.5);
        assert_eq!(capture.patterns()[0].values, vec![250.0]);
        assert_eq!(capture.patterns()[1].values, vec![999.0]);
    }

    #[test]
    fn test_overall_fingerprint() {
        let hub = InputHub::new(16);
        let log = create_shared_log();
        let mut capture = aggregator(&Config::default()).with_transparency(log.clone());

        assert!(is_fallback(&capture.overall_fingerprint()));

        capture.start(&hub).unwrap();
        for sample in typing_samples() {
            capture.ingest(sample);
        }

        let overall = capture.overall_fingerprint();
        assert!(is_well_formed(&overall));
        assert!(!is_fallback(&overall));
        // A single pattern flattens to its own values.
        assert_eq!(overall, capture.patterns()[0].fingerprint);
        assert_eq!(log.stats().fingerprints_generated, 2);
    }

    #[test]
    fn test_disabled_source_is_ignored() {
        let mut config = Config::default();
        config.sources = SourceConfig::from_csv("keyboard");
        let hub = InputHub::new(16);
        let log = create_shared_log();
        let mut capture = aggregator(&config).with_transparency(log.clone());
        capture.start(&hub).unwrap();

        let nav = RawSample::Navigation(NavigationSample::new(NavigationKind::Scroll, 1.0));
        assert!(capture.ingest(nav).is_none());
        assert_eq!(capture.pattern_count(), 0);
        assert_eq!(log.stats().samples_ignored, 1);
    }

    #[test]
    fn test_stop_keeps_patterns() {
        let hub = InputHub::new(16);
        let mut capture = aggregator(&Config::default());
        capture.start(&hub).unwrap();
        for sample in typing_samples() {
            capture.ingest(sample);
        }

        capture.stop();
        assert!(!capture.is_capturing());
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(capture.pattern_count(), 1);
        assert_eq!(hub.dispatch(RawSample::Key(KeySample::down("c", 300.0))), 0);
    }
}
