//! Transparency module for the capture pipeline.
//!
//! This module tracks and exposes how much input the pipeline has
//! processed and what it derived from it.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, SharedTransparencyLog, TransparencyLog, TransparencyStats};
