//! Pipeline run identity and result.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::segment::Segment;
use crate::timestamp::format_clock;

/// Unique identifier for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one pipeline run.
///
/// A failed run never carries highlights or a reel; a successful run may
/// carry zero highlights, in which case `highlights_video` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunResult {
    pub run_id: RunId,

    /// Video the run was started on
    pub original_video: PathBuf,

    /// Segments produced by the segmenter, ascending by start offset
    pub segments: Vec<Segment>,

    /// Highlight instants in source time, ascending
    pub highlight_timestamps: Vec<f64>,

    /// Path of the assembled reel, if one was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights_video: Option<PathBuf>,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration of the run in seconds
    pub processing_time: f64,
}

impl RunResult {
    /// Result of a run that reached the done stage.
    pub fn completed(
        run_id: RunId,
        original_video: impl Into<PathBuf>,
        segments: Vec<Segment>,
        highlight_timestamps: Vec<f64>,
        highlights_video: Option<PathBuf>,
        processing_time: f64,
    ) -> Self {
        Self {
            run_id,
            original_video: original_video.into(),
            segments,
            highlight_timestamps,
            highlights_video,
            success: true,
            error: None,
            processing_time,
        }
    }

    /// Result of a run that failed; everything but the error is empty.
    pub fn failed(
        run_id: RunId,
        original_video: impl Into<PathBuf>,
        error: impl Into<String>,
        processing_time: f64,
    ) -> Self {
        Self {
            run_id,
            original_video: original_video.into(),
            segments: Vec::new(),
            highlight_timestamps: Vec::new(),
            highlights_video: None,
            success: false,
            error: Some(error.into()),
            processing_time,
        }
    }

    /// Highlight instants formatted as `MM:SS`.
    pub fn formatted_timestamps(&self) -> Vec<String> {
        self.highlight_timestamps
            .iter()
            .map(|t| format_clock(*t))
            .collect()
    }
}
