//! Core functionality of the capture pipeline.
//!
//! This module contains:
//! - Fingerprint encoding of numeric sequences
//! - Pattern extraction from rolling sample windows
//! - The capture aggregator that owns buffers and patterns
//! - Report building for export

pub mod capture;
pub mod cipher;
pub mod clock;
pub mod extractor;
pub mod report;

// Re-export commonly used types
pub use capture::{mean_confidence, CaptureAggregator, CaptureError, CaptureState, SampleBuffers};
pub use cipher::{encode, is_fallback, is_well_formed, tolerance, FingerprintEncoder, SIGNATURE_TAG};
pub use clock::{system_clock, Clock, FixedClock, SharedClock, SystemClock};
pub use extractor::{calculate_confidence, Modality, Pattern, PatternExtractor};
pub use report::{
    CaptureReport, ConfidenceBand, ReportBuilder, SessionStatus, TrustLevel, PRODUCER_NAME,
    REPORT_VERSION,
};
