//! Capture report builder.
//!
//! A report is a serializable snapshot of one capture session: the patterns
//! collected so far, their aggregate confidence and the overall fingerprint,
//! plus the display-oriented verification score and trust level derived from
//! that confidence.

use crate::collector::types::SampleSource;
use crate::core::capture::{CaptureAggregator, CaptureState};
use crate::core::cipher::is_well_formed;
use crate::core::extractor::{Modality, Pattern};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "cryptoid-capture";

/// Outcome of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Still capturing
    Active,
    /// Stopped with at least one pattern
    Completed,
    /// Stopped without any pattern
    Failed,
}

/// Trust level bucket of a verification score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    New,
    Developing,
    Verified,
    Trusted,
    HighlyTrusted,
}

impl TrustLevel {
    /// Bucket a 0-100 score.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => TrustLevel::HighlyTrusted,
            80..=89 => TrustLevel::Trusted,
            60..=79 => TrustLevel::Verified,
            40..=59 => TrustLevel::Developing,
            _ => TrustLevel::New,
        }
    }
}

/// Coarse confidence band for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < 0.3 {
            ConfidenceBand::Low
        } else if confidence < 0.7 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::High
        }
    }
}

/// Confidence as a rounded 0-100 score.
pub fn verification_score(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Serializable snapshot of a capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    pub report_version: String,
    pub producer: ReportProducer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// When this report was computed (RFC3339)
    pub computed_at_utc: String,
    pub status: SessionStatus,
    pub pattern_count: usize,
    pub patterns_by_modality: HashMap<Modality, usize>,
    pub overall_confidence: f64,
    pub confidence_band: ConfidenceBand,
    pub verification_score: u8,
    pub trust_level: TrustLevel,
    pub fingerprint: String,
    pub fingerprint_well_formed: bool,
    pub patterns: Vec<Pattern>,
    /// Buffered sample counts and other details
    pub meta: HashMap<String, serde_json::Value>,
}

/// Builder for capture reports.
pub struct ReportBuilder {
    instance_id: Uuid,
    session_id: Option<String>,
}

impl ReportBuilder {
    /// Create a new report builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            session_id: None,
        }
    }

    /// Set the session ID for generated reports.
    pub fn with_session_id(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Get the instance ID.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a report from the aggregator's current state.
    pub fn build(&self, capture: &CaptureAggregator) -> CaptureReport {
        let computed_at = Utc::now();
        let patterns = capture.patterns().to_vec();

        let status = match capture.state() {
            CaptureState::Capturing => SessionStatus::Active,
            CaptureState::Idle if patterns.is_empty() => SessionStatus::Failed,
            CaptureState::Idle => SessionStatus::Completed,
        };

        let mut patterns_by_modality = HashMap::new();
        for pattern in &patterns {
            *patterns_by_modality.entry(pattern.modality).or_insert(0) += 1;
        }

        let overall_confidence = capture.overall_confidence();
        let score = verification_score(overall_confidence);
        let fingerprint = capture.overall_fingerprint();

        let mut meta = HashMap::new();
        for (name, source) in [
            ("buffered_key_samples", SampleSource::Keyboard),
            ("buffered_pointer_samples", SampleSource::Pointer),
            ("buffered_touch_samples", SampleSource::Touch),
            ("buffered_navigation_samples", SampleSource::Navigation),
        ] {
            meta.insert(
                name.to_string(),
                serde_json::Value::Number(serde_json::Number::from(capture.buffered(source))),
            );
        }

        CaptureReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.to_string(),
            },
            session_id: self.session_id.clone(),
            computed_at_utc: computed_at.to_rfc3339(),
            status,
            pattern_count: patterns.len(),
            patterns_by_modality,
            overall_confidence,
            confidence_band: ConfidenceBand::from_confidence(overall_confidence),
            verification_score: score,
            trust_level: TrustLevel::from_score(score),
            fingerprint_well_formed: is_well_formed(&fingerprint),
            fingerprint,
            patterns,
            meta,
        }
    }

    /// Build and serialize a report to JSON.
    pub fn build_json(&self, capture: &CaptureAggregator) -> String {
        let report = self.build(capture);
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
