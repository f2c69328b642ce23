//! Configuration for the capture pipeline.

use crate::collector::types::SampleSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which input sources to capture
    pub sources: SourceConfig,

    /// Extraction thresholds
    pub extractor: ExtractorConfig,

    /// Per-subscription queue size on the input hub
    pub channel_capacity: usize,

    /// How often live capture reports progress
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourceConfig::default(),
            extractor: ExtractorConfig::default(),
            channel_capacity: 10_000,
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(config_path)
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cryptoid-capture")
            .join("config.json")
    }
}

/// Configuration for which input sources to capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub pointer: bool,
    pub touch: bool,
    pub navigation: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            pointer: true,
            touch: true,
            navigation: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        let has = |names: &[&str]| {
            sources
                .iter()
                .any(|s| s == "all" || names.contains(&s.as_str()))
        };

        Self {
            keyboard: has(&["keyboard", "keystroke"]),
            pointer: has(&["pointer", "mouse"]),
            touch: has(&["touch"]),
            navigation: has(&["navigation", "nav"]),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.pointer || self.touch || self.navigation
    }

    /// Check whether samples from `source` should be captured.
    pub fn allows(&self, source: SampleSource) -> bool {
        match source {
            SampleSource::Keyboard => self.keyboard,
            SampleSource::Pointer => self.pointer,
            SampleSource::Touch => self.touch,
            SampleSource::Navigation => self.navigation,
        }
    }
}

/// Thresholds for the pattern extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Key events needed before the keystroke path runs
    pub keystroke_window: usize,
    /// Pointer events needed before the pointer path runs
    pub pointer_window: usize,
    /// Fixed confidence of navigation patterns
    pub navigation_confidence: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            keystroke_window: 4,
            pointer_window: 5,
            navigation_confidence: 0.8,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration (as milliseconds).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
