//! Raw sample collection for the capture pipeline.
//!
//! This module defines the raw input sample types, the hub that fans them
//! out to subscribers, and helpers for replaying recorded sample streams.

pub mod hub;
pub mod recording;
pub mod types;

// Re-export commonly used types
pub use hub::{InputHub, Subscription};
pub use recording::{feed_lines, load_recording, parse_recording, RecordingError, RecordingFormat};
pub use types::{
    KeyPhase, KeySample, NavigationKind, NavigationSample, PointerKind, PointerSample, RawSample,
    SampleSource, TouchSample,
};
