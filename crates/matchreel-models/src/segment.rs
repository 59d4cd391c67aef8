//! Segments cut from the source match video.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A fixed-duration slice of the source video, written to its own file.
///
/// Offsets are in seconds on the source video's time base. Segments are
/// created in ascending `start_offset` order and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// Position of this slice in the source (0-based)
    pub index: usize,

    /// Path of the independently encoded slice
    pub path: PathBuf,

    /// Start of the slice in the source video (seconds)
    pub start_offset: f64,

    /// End of the slice in the source video (seconds, exclusive)
    pub end_offset: f64,
}

impl Segment {
    /// Create a new segment.
    pub fn new(index: usize, path: impl Into<PathBuf>, start_offset: f64, end_offset: f64) -> Self {
        Self {
            index,
            path: path.into(),
            start_offset,
            end_offset,
        }
    }

    /// Length of the slice in seconds.
    pub fn duration(&self) -> f64 {
        self.end_offset - self.start_offset
    }

    /// Convert a timestamp relative to this segment into source time.
    pub fn to_absolute(&self, relative_secs: f64) -> f64 {
        self.start_offset + relative_secs
    }
}
