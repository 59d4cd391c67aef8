//! Pipeline stages and progress updates.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a pipeline run.
///
/// Runs move `Segmenting -> Analyzing -> Assembling -> Done`; `Failed` is
/// reachable from any stage and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Segmenting,
    Analyzing,
    Assembling,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Segmenting => "segmenting",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Assembling => "assembling",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    /// Step number reported to progress sinks (1-3).
    ///
    /// Terminal stages report as the last step.
    pub fn step(&self) -> u8 {
        match self {
            PipelineStage::Segmenting => 1,
            PipelineStage::Analyzing => 2,
            PipelineStage::Assembling | PipelineStage::Done | PipelineStage::Failed => 3,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Number of steps a run reports progress for.
pub const TOTAL_STEPS: u8 = 3;

/// A single progress event emitted by the pipeline controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressUpdate {
    /// Step number (1 = segmenting, 2 = analyzing, 3 = assembling)
    pub step: u8,
    /// Human-readable status line
    pub message: String,
    /// Overall completion, 0-100
    pub percent: u8,
    pub timestamp: DateTime<Utc>,
}

impl ProgressUpdate {
    /// Create an update, clamping step into 1-3 and percent into 0-100.
    pub fn new(step: u8, message: impl Into<String>, percent: u8) -> Self {
        Self {
            step: step.clamp(1, TOTAL_STEPS),
            message: message.into(),
            percent: percent.min(100),
            timestamp: Utc::now(),
        }
    }

    /// Create an update for a pipeline stage.
    pub fn for_stage(stage: PipelineStage, message: impl Into<String>, percent: u8) -> Self {
        Self::new(stage.step(), message, percent)
    }

    /// Status line in the "Step n/3: message" form shown to users.
    pub fn status_line(&self) -> String {
        format!("Step {}/{}: {}", self.step, TOTAL_STEPS, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_steps() {
        assert_eq!(PipelineStage::Segmenting.step(), 1);
        assert_eq!(PipelineStage::Analyzing.step(), 2);
        assert_eq!(PipelineStage::Assembling.step(), 3);
        assert_eq!(PipelineStage::Failed.step(), 3);
    }

    #[test]
    fn test_update_clamps() {
        let update = ProgressUpdate::new(7, "done", 140);
        assert_eq!(update.step, 3);
        assert_eq!(update.percent, 100);
        let update = ProgressUpdate::new(0, "start", 0);
        assert_eq!(update.step, 1);
    }

    #[test]
    fn test_status_line() {
        let update = ProgressUpdate::for_stage(PipelineStage::Analyzing, "Found 4 highlights", 66);
        assert_eq!(update.status_line(), "Step 2/3: Found 4 highlights");
    }
}
