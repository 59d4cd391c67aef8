//! Shared data models for the MatchReel highlight pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Segments cut from a source match video
//! - Model detections, highlight instants and highlight windows
//! - Pipeline stages, progress updates and the run result
//! - Encoding configuration

pub mod encoding;
pub mod highlight;
pub mod progress;
pub mod run;
pub mod segment;
pub mod timestamp;

// Re-export common types
pub use encoding::EncodingConfig;
pub use highlight::{Detection, HighlightCategory, HighlightWindow};
pub use progress::{PipelineStage, ProgressUpdate};
pub use run::{RunId, RunResult};
pub use segment::Segment;
pub use timestamp::{format_clock, parse_timestamp, TimestampError};
