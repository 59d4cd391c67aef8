//! Per-segment highlight detection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use matchreel_inference::{InferenceError, VisionInference};
use matchreel_models::{Detection, HighlightCategory, Segment};

use crate::error::PipelineResult;
use crate::metrics;
use crate::parser::parse_response;

/// MIME type of the segments the segmenter writes.
pub const SEGMENT_MIME_TYPE: &str = "video/mp4";

/// Instruction asking the model for timestamped events from the fixed
/// category vocabulary.
pub fn default_instruction() -> String {
    let categories = HighlightCategory::PROMPTED
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.label()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are watching one segment of a football match.
Identify the moments worth including in a highlight reel. Look for:
{categories}

Return ONLY a JSON list. Each element must have:
- "timestamp_seconds": seconds from the start of THIS segment
- "event_type": one of the categories above
- "confidence_score": a number between 0 and 1

Example:
[
  {{"timestamp_seconds": 45.2, "event_type": "Goal", "confidence_score": 0.95}},
  {{"timestamp_seconds": 120.7, "event_type": "Great save", "confidence_score": 0.85}}
]

Return [] if nothing in the segment qualifies."#
    )
}

/// Runs the vision model over one segment and returns highlight instants.
pub struct HighlightDetector {
    inference: Arc<dyn VisionInference>,
    timeout: Duration,
    instruction: String,
}

impl HighlightDetector {
    pub fn new(inference: Arc<dyn VisionInference>, timeout: Duration) -> Self {
        Self {
            inference,
            timeout,
            instruction: default_instruction(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Highlight instants for `segment`, in source time.
    ///
    /// Every failure is logged and turned into an empty result.
    pub async fn detect(&self, segment: &Segment) -> Vec<f64> {
        match self.detect_relative(segment).await {
            Ok(detections) => {
                let instants: Vec<f64> = detections
                    .iter()
                    .map(|d| segment.to_absolute(d.relative_timestamp))
                    .collect();
                info!(
                    segment = segment.index + 1,
                    "Found {} highlights in segment {:.0}-{:.0}s",
                    instants.len(),
                    segment.start_offset,
                    segment.end_offset
                );
                instants
            }
            Err(e) => {
                warn!(
                    segment = segment.index + 1,
                    "Highlight detection failed for segment {:.0}-{:.0}s: {}",
                    segment.start_offset,
                    segment.end_offset,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Detections for `segment` with segment-relative timestamps.
    pub async fn detect_relative(&self, segment: &Segment) -> PipelineResult<Vec<Detection>> {
        let media = tokio::fs::read(&segment.path).await?;
        debug!(
            segment = segment.index + 1,
            "Segment loaded: {:.2} MB",
            media.len() as f64 / (1024.0 * 1024.0)
        );

        let started = Instant::now();
        let response = tokio::time::timeout(
            self.timeout,
            self.inference
                .infer(&media, SEGMENT_MIME_TYPE, &self.instruction),
        )
        .await
        .unwrap_or(Err(InferenceError::Timeout(self.timeout.as_secs())));
        let latency = started.elapsed().as_secs_f64();

        let text = match response {
            Ok(text) => {
                metrics::record_inference("ok", latency);
                text
            }
            Err(e) => {
                let outcome = if matches!(e, InferenceError::Timeout(_)) {
                    "timeout"
                } else {
                    "error"
                };
                metrics::record_inference(outcome, latency);
                return Err(e.into());
            }
        };

        let parsed = parse_response(&text);
        metrics::record_detections(parsed.tier.as_str(), parsed.detections.len());
        Ok(parsed.detections)
    }
}
