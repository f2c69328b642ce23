//! CryptoID Capture - behavioral sample capture and fingerprint derivation.
//!
//! This library turns raw input samples (key presses, pointer movement,
//! focus and scroll events) into small feature vectors with a naive
//! consistency score, and stamps them with an opaque fingerprint token.
//!
//! # What this is not
//!
//! - **Not biometric matching**: confidence is a spread measure, nothing more
//! - **Not cryptography**: fingerprints are deterministic, reversible-looking
//!   strings with no security properties
//! - **Not persistent**: samples and patterns live in memory until reset
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CryptoID Capture                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Input Hub  │──▶│   Capture   │──▶│  Extractor  │       │
//! │  │ (dispatch)  │   │ (buffers)   │   │ (patterns)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           │                  │              │
//! │                           ▼                  ▼              │
//! │                    ┌─────────────┐   ┌─────────────┐       │
//! │                    │   Report    │   │   Cipher    │       │
//! │                    │  Snapshot   │   │(fingerprint)│       │
//! │                    └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cryptoid_capture::{CaptureAggregator, Config, InputHub};
//! use cryptoid_capture::collector::{KeySample, RawSample};
//!
//! let hub = InputHub::default();
//! let mut capture = CaptureAggregator::new(&Config::default());
//! capture.start(&hub).expect("fresh aggregator is idle");
//!
//! for sample in [
//!     KeySample::down("a", 0.0),
//!     KeySample::up("a", 80.0),
//!     KeySample::down("b", 150.0),
//!     KeySample::up("b", 210.0),
//! ] {
//!     hub.dispatch(RawSample::Key(sample));
//! }
//! capture.pump();
//!
//! assert_eq!(capture.pattern_count(), 1);
//! assert!(cryptoid_capture::is_well_formed(&capture.overall_fingerprint()));
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{InputHub, RawSample, RecordingError, RecordingFormat, Subscription};
pub use config::{Config, ConfigError, ExtractorConfig, SourceConfig};
pub use core::{
    encode, is_well_formed, tolerance, CaptureAggregator, CaptureError, CaptureReport,
    CaptureState, FingerprintEncoder, Modality, Pattern, ReportBuilder, TrustLevel,
};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Disclaimer that can be displayed to users.
pub const DISCLAIMER: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                CRYPTOID CAPTURE - DISCLAIMER                     ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool derives a demo "behavioral fingerprint" from input    ║
║  timing.                                                         ║
║                                                                  ║
║  ✓ WHAT IT OBSERVES:                                             ║
║    • Key press and release timing (and key identity, to pair     ║
║      presses with releases)                                      ║
║    • Pointer position and timing (to compute speed)              ║
║    • Focus changes and scrolls (timing only)                     ║
║                                                                  ║
║  ✗ WHAT IT NEVER DOES:                                           ║
║    • Store samples or patterns on disk                           ║
║    • Send anything over the network                              ║
║    • Provide real identity verification or cryptographic         ║
║      signatures                                                  ║
║                                                                  ║
║  Fingerprints and trust levels are illustrative only.            ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
