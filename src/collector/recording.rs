//! Loading recorded sample streams for replay.
//!
//! A recording is either a JSON array of [`RawSample`] or JSON Lines with one
//! sample per line. Blank lines in JSON Lines input are skipped.

use crate::collector::hub::InputHub;
use crate::collector::types::RawSample;
use std::io::BufRead;
use std::path::Path;

/// Recording file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingFormat {
    Json,
    JsonLines,
}

impl RecordingFormat {
    /// Parse a format name (`json` or `jsonl`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "json" => Some(RecordingFormat::Json),
            "jsonl" | "ndjson" => Some(RecordingFormat::JsonLines),
            _ => None,
        }
    }
}

/// Errors that can occur while reading a recording.
#[derive(Debug)]
pub enum RecordingError {
    IoError(String),
    ParseError { line: usize, message: String },
}

impl std::fmt::Display for RecordingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordingError::IoError(e) => write!(f, "IO error: {e}"),
            RecordingError::ParseError { line, message } => {
                write!(f, "Parse error at line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for RecordingError {}

/// Parse recording content in the given format.
pub fn parse_recording(
    content: &str,
    format: RecordingFormat,
) -> Result<Vec<RawSample>, RecordingError> {
    match format {
        RecordingFormat::Json => {
            serde_json::from_str(content).map_err(|e| RecordingError::ParseError {
                line: e.line(),
                message: e.to_string(),
            })
        }
        RecordingFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| parse_line(line, idx + 1))
            .collect(),
    }
}

/// Parse a single JSON Lines entry. `line_number` is 1-based, used for errors.
pub fn parse_line(line: &str, line_number: usize) -> Result<RawSample, RecordingError> {
    serde_json::from_str(line.trim()).map_err(|e| RecordingError::ParseError {
        line: line_number,
        message: e.to_string(),
    })
}

/// Read and parse a recording file.
pub fn load_recording(
    path: &Path,
    format: RecordingFormat,
) -> Result<Vec<RawSample>, RecordingError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| RecordingError::IoError(e.to_string()))?;
    parse_recording(&content, format)
}

/// Dispatch every sample of a recording, in order. Returns deliveries made.
pub fn replay_into(hub: &InputHub, samples: Vec<RawSample>) -> usize {
    samples
        .into_iter()
        .map(|sample| hub.dispatch(sample))
        .sum()
}

/// Stream JSON Lines from `reader` into the hub until EOF.
///
/// Each sample waits for queue space, so a slow consumer never loses input.
/// Malformed lines are logged and skipped. Returns the number of samples
/// dispatched.
pub fn feed_lines(hub: &InputHub, reader: impl BufRead) -> Result<usize, RecordingError> {
    let mut dispatched = 0;
    let mut last_timestamp = None;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| RecordingError::IoError(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line, idx + 1) {
            Ok(sample) => {
                last_timestamp = Some(sample.timestamp_ms());
                hub.dispatch_blocking(sample);
                dispatched += 1;
            }
            Err(e) => tracing::warn!(error = %e, "skipping sample"),
        }
    }

    tracing::debug!(dispatched, last_timestamp_ms = ?last_timestamp, "input stream ended");
    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{KeySample, SampleSource};

    #[test]
    fn test_format_names() {
        assert_eq!(RecordingFormat::from_name("JSON"), Some(RecordingFormat::Json));
        assert_eq!(
            RecordingFormat::from_name("jsonl"),
            Some(RecordingFormat::JsonLines)
        );
        assert_eq!(RecordingFormat::from_name("csv"), None);
    }

    #[test]
    fn test_parse_json_lines() {
        let content = r#"{"kind":"key","key":"a","phase":"down","timestamp_ms":0}

{"kind":"pointer","x":1,"y":2,"action":"click","timestamp_ms":5}
"#;
        let samples = parse_recording(content, RecordingFormat::JsonLines).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], RawSample::Key(KeySample::down("a", 0.0)));
        assert_eq!(samples[1].source(), SampleSource::Pointer);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let content = "{\"kind\":\"key\",\"key\":\"a\",\"phase\":\"up\",\"timestamp_ms\":1}\nnot json\n";
        match parse_recording(content, RecordingFormat::JsonLines) {
            Err(RecordingError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_feed_lines_keeps_every_sample_past_capacity() {
        let hub = InputHub::new(8);
        let sub = hub.subscribe();
        let prefix = r#"{"kind":"navigation","event":"scroll","timestamp_ms":"#;
        let content: String = (0..500).map(|i| format!("{prefix}{i}}}\n")).collect();

        let feeder = {
            let hub = hub.clone();
            std::thread::spawn(move || feed_lines(&hub, std::io::Cursor::new(content)))
        };

        let received: Vec<RawSample> = sub.receiver().iter().take(500).collect();
        assert_eq!(feeder.join().unwrap().unwrap(), 500);
        assert_eq!(received.len(), 500);
        assert_eq!(received[499].timestamp_ms(), 499.0);
    }

    #[test]
    fn test_feed_lines_skips_malformed() {
        let hub = InputHub::new(8);
        let sub = hub.subscribe();
        let content = r#"not json

{"kind":"key","key":"a","phase":"up","timestamp_ms":3}
"#;

        assert_eq!(feed_lines(&hub, content.as_bytes()).unwrap(), 1);
        assert_eq!(sub.try_recv(), Some(RawSample::Key(KeySample::up("a", 3.0))));
    }

    #[test]
    fn test_parse_json_array() {
        let content = r#"[{"kind":"navigation","event":"scroll","timestamp_ms":1234}]"#;
        let samples = parse_recording(content, RecordingFormat::Json).unwrap();
        assert_eq!(samples.len(), 1);
    }
}
