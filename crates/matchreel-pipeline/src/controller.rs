//! Pipeline controller.
//!
//! Drives one run through `Segmenting -> Analyzing -> Assembling -> Done`.
//! Every exit path produces a complete [`RunResult`]; errors escaping a stage
//! are caught here and turned into a failed result.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use matchreel_inference::VisionInference;
use matchreel_media::{Concatenator, FfmpegVideo, VideoSource};
use matchreel_models::{PipelineStage, ProgressUpdate, RunId, RunResult};

use crate::assembler::ReelAssembler;
use crate::config::PipelineConfig;
use crate::coordinator::AnalysisCoordinator;
use crate::detector::HighlightDetector;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::progress::{NoopProgress, ProgressSink};
use crate::segmenter::Segmenter;

/// Evenly spaced progress points reported while segments are analyzed.
const ANALYSIS_CHECKPOINTS: usize = 9;
const ANALYSIS_START_PERCENT: usize = 35;
const ANALYSIS_SPAN_PERCENT: usize = 30;

/// Percent reported at analysis checkpoint `checkpoint` of
/// [`ANALYSIS_CHECKPOINTS`].
fn analysis_percent(checkpoint: usize) -> u8 {
    (ANALYSIS_START_PERCENT + checkpoint * ANALYSIS_SPAN_PERCENT / ANALYSIS_CHECKPOINTS) as u8
}

/// Checkpoints passed once `done` of `total` segments have finished. The last
/// checkpoint is left to the stage-end report.
fn checkpoints_reached(done: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (done * ANALYSIS_CHECKPOINTS / total).min(ANALYSIS_CHECKPOINTS - 1)
}

/// The highlight reel pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    segmenter: Segmenter,
    coordinator: AnalysisCoordinator,
    assembler: ReelAssembler,
}

impl Pipeline {
    /// Wire the pipeline from its media and inference capabilities.
    pub fn new(
        config: PipelineConfig,
        video: Arc<dyn VideoSource>,
        concatenator: Arc<dyn Concatenator>,
        inference: Arc<dyn VisionInference>,
    ) -> Self {
        let segmenter = Segmenter::new(Arc::clone(&video), config.segments_dir());
        let detector = HighlightDetector::new(inference, config.inference_timeout);
        let coordinator = AnalysisCoordinator::new(Arc::new(detector), config.max_parallel_analyses);
        let assembler = ReelAssembler::new(video, concatenator, config.output_dir());

        Self {
            config,
            segmenter,
            coordinator,
            assembler,
        }
    }

    /// Pipeline backed by the FFmpeg CLI.
    pub fn with_ffmpeg(config: PipelineConfig, inference: Arc<dyn VisionInference>) -> Self {
        let ffmpeg = Arc::new(FfmpegVideo::with_timeout(config.ffmpeg_timeout.as_secs()));
        Self::new(config, ffmpeg.clone(), ffmpeg, inference)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline on `video` without progress reporting.
    pub async fn run(&self, video: &Path) -> RunResult {
        self.run_with_progress(video, &NoopProgress).await
    }

    /// Run the pipeline on `video`, reporting progress to `progress`.
    pub async fn run_with_progress(&self, video: &Path, progress: &dyn ProgressSink) -> RunResult {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id, "highlight_reel");
        let span = logger.create_span();

        async {
            let started = Instant::now();
            logger.log_start(&video.display().to_string());

            let result = match self.run_stages(&run_id, video, progress, &logger, started).await {
                Ok(result) => result,
                Err(e) => {
                    logger.log_error(&e.to_string());
                    progress.report(ProgressUpdate::for_stage(
                        PipelineStage::Failed,
                        format!("Error: {}", e),
                        100,
                    ));
                    RunResult::failed(
                        run_id.clone(),
                        video,
                        e.to_string(),
                        started.elapsed().as_secs_f64(),
                    )
                }
            };

            metrics::record_run(result.success, result.processing_time);
            if result.success {
                logger.log_completion(&format!(
                    "{} highlights in {:.2}s",
                    result.highlight_timestamps.len(),
                    result.processing_time
                ));
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        run_id: &RunId,
        video: &Path,
        progress: &dyn ProgressSink,
        logger: &RunLogger,
        started: Instant,
    ) -> PipelineResult<RunResult> {
        self.config.validate()?;
        self.config.ensure_folders().await?;

        // Segmenting
        progress.report(ProgressUpdate::for_stage(
            PipelineStage::Segmenting,
            "Segmenting video...",
            5,
        ));
        let segments = self
            .segmenter
            .segment(video, self.config.segment_length_secs)
            .await;

        if segments.is_empty() {
            let error = PipelineError::SegmentationFailed.to_string();
            logger.log_error(&error);
            progress.report(ProgressUpdate::for_stage(
                PipelineStage::Segmenting,
                error.as_str(),
                100,
            ));
            return Ok(RunResult::failed(
                run_id.clone(),
                video,
                error,
                started.elapsed().as_secs_f64(),
            ));
        }

        logger.log_progress(&format!("video segmented into {} parts", segments.len()));
        progress.report(ProgressUpdate::for_stage(
            PipelineStage::Segmenting,
            format!("Video segmented into {} parts", segments.len()),
            33,
        ));

        // Analyzing
        progress.report(ProgressUpdate::for_stage(
            PipelineStage::Analyzing,
            "Analyzing segments for highlights...",
            ANALYSIS_START_PERCENT as u8,
        ));

        let mut reported = 0;
        let highlights = self
            .coordinator
            .analyze_all_with_progress(&segments, |done, total| {
                let reached = checkpoints_reached(done, total);
                while reported < reached {
                    reported += 1;
                    progress.report(ProgressUpdate::for_stage(
                        PipelineStage::Analyzing,
                        format!("Analyzed {} of {} segments", done, total),
                        analysis_percent(reported),
                    ));
                }
            })
            .await;

        logger.log_progress(&format!("found {} highlights", highlights.len()));
        progress.report(ProgressUpdate::for_stage(
            PipelineStage::Analyzing,
            format!("Found {} highlights", highlights.len()),
            66,
        ));

        // Assembling
        progress.report(ProgressUpdate::for_stage(
            PipelineStage::Assembling,
            "Creating highlights video...",
            70,
        ));

        let reel = if highlights.is_empty() {
            logger.log_warning("no highlights detected, skipping reel assembly");
            progress.report(ProgressUpdate::for_stage(
                PipelineStage::Assembling,
                "No highlights detected",
                95,
            ));
            None
        } else {
            let reel = self
                .assembler
                .assemble(video, &highlights, self.config.highlight_buffer_secs)
                .await;
            let message = if reel.is_some() {
                "Highlights video created successfully"
            } else {
                logger.log_warning("highlights found but no reel was written");
                "Failed to create highlights video"
            };
            progress.report(ProgressUpdate::for_stage(PipelineStage::Assembling, message, 95));
            reel
        };

        progress.report(ProgressUpdate::for_stage(
            PipelineStage::Done,
            "Process complete",
            100,
        ));

        Ok(RunResult::completed(
            run_id.clone(),
            video,
            segments,
            highlights,
            reel,
            started.elapsed().as_secs_f64(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_percents_stay_within_stage() {
        let percents: Vec<u8> = (1..ANALYSIS_CHECKPOINTS).map(analysis_percent).collect();
        assert_eq!(percents, vec![38, 41, 45, 48, 51, 55, 58, 61]);
        assert!(percents.iter().all(|p| *p > 35 && *p < 66));
    }

    #[test]
    fn test_checkpoints_reached() {
        assert_eq!(checkpoints_reached(0, 3), 0);
        assert_eq!(checkpoints_reached(1, 3), 3);
        assert_eq!(checkpoints_reached(2, 3), 6);
        assert_eq!(checkpoints_reached(3, 3), 8);
        assert_eq!(checkpoints_reached(1, 20), 0);
        assert_eq!(checkpoints_reached(5, 0), 0);
    }
}
