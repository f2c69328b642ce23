//! Raw input sample types consumed by the capture pipeline.
//!
//! Timestamps are host ticks in milliseconds (monotonic, fractional), the
//! same clock an input-dispatch loop stamps its events with.

use serde::{Deserialize, Serialize};

/// Whether a key event is a press or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPhase {
    Down,
    Up,
}

/// Kind of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Move,
    Click,
}

/// Kind of navigation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    FocusIn,
    FocusOut,
    Scroll,
}

/// A key press or release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySample {
    pub key: String,
    pub phase: KeyPhase,
    pub timestamp_ms: f64,
}

impl KeySample {
    pub fn down(key: impl Into<String>, timestamp_ms: f64) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Down,
            timestamp_ms,
        }
    }

    pub fn up(key: impl Into<String>, timestamp_ms: f64) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Up,
            timestamp_ms,
        }
    }
}

/// A pointer move or click in client coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "action")]
    pub kind: PointerKind,
    pub timestamp_ms: f64,
}

impl PointerSample {
    pub fn movement(x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self {
            x,
            y,
            kind: PointerKind::Move,
            timestamp_ms,
        }
    }

    pub fn click(x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self {
            x,
            y,
            kind: PointerKind::Click,
            timestamp_ms,
        }
    }

    /// Euclidean distance to another sample.
    pub fn distance_to(&self, other: &PointerSample) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A touch contact. Buffered but never analysed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub x: f64,
    pub y: f64,
    /// Contact force; hosts that do not report it get 0.5
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    pub timestamp_ms: f64,
}

fn default_pressure() -> f64 {
    0.5
}

/// A focus change or scroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationSample {
    #[serde(rename = "event")]
    pub kind: NavigationKind,
    pub timestamp_ms: f64,
}

impl NavigationSample {
    pub fn new(kind: NavigationKind, timestamp_ms: f64) -> Self {
        Self { kind, timestamp_ms }
    }
}

/// Input channel a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    Keyboard,
    Pointer,
    Touch,
    Navigation,
}

/// Unified raw sample type delivered by the input hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawSample {
    Key(KeySample),
    Pointer(PointerSample),
    Touch(TouchSample),
    Navigation(NavigationSample),
}

impl RawSample {
    pub fn timestamp_ms(&self) -> f64 {
        match self {
            RawSample::Key(s) => s.timestamp_ms,
            RawSample::Pointer(s) => s.timestamp_ms,
            RawSample::Touch(s) => s.timestamp_ms,
            RawSample::Navigation(s) => s.timestamp_ms,
        }
    }

    pub fn source(&self) -> SampleSource {
        match self {
            RawSample::Key(_) => SampleSource::Keyboard,
            RawSample::Pointer(_) => SampleSource::Pointer,
            RawSample::Touch(_) => SampleSource::Touch,
            RawSample::Navigation(_) => SampleSource::Navigation,
        }
    }
}
