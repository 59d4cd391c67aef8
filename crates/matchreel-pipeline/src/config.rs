//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Length of each analysis segment in seconds
    pub segment_length_secs: f64,
    /// Seconds kept on each side of a highlight instant
    pub highlight_buffer_secs: f64,
    /// Wall-clock limit for one segment's inference call
    pub inference_timeout: Duration,
    /// Maximum inference calls in flight; 0 means unbounded
    pub max_parallel_analyses: usize,
    /// Root of the `segments/` and `output/` folders
    pub work_dir: PathBuf,
    /// Wall-clock limit for a single FFmpeg invocation
    pub ffmpeg_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_length_secs: 300.0,
            highlight_buffer_secs: 5.0,
            inference_timeout: Duration::from_secs(300),
            max_parallel_analyses: 0,
            work_dir: PathBuf::from("./football_highlights"),
            ffmpeg_timeout: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            segment_length_secs: std::env::var("SEGMENT_LENGTH_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.segment_length_secs),
            highlight_buffer_secs: std::env::var("HIGHLIGHT_BUFFER_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.highlight_buffer_secs),
            inference_timeout: std::env::var("INFERENCE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.inference_timeout),
            max_parallel_analyses: std::env::var("MAX_PARALLEL_ANALYSES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_parallel_analyses),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_timeout: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ffmpeg_timeout),
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.segment_length_secs.is_finite() || self.segment_length_secs <= 0.0 {
            return Err(PipelineError::config_error(format!(
                "segment length must be positive, got {}",
                self.segment_length_secs
            )));
        }
        if !self.highlight_buffer_secs.is_finite() || self.highlight_buffer_secs < 0.0 {
            return Err(PipelineError::config_error(format!(
                "highlight buffer must be non-negative, got {}",
                self.highlight_buffer_secs
            )));
        }
        if self.inference_timeout.is_zero() {
            return Err(PipelineError::config_error("inference timeout must be non-zero"));
        }
        Ok(())
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.work_dir.join("segments")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join("output")
    }

    /// Create the work folders if they are missing.
    pub async fn ensure_folders(&self) -> PipelineResult<()> {
        for dir in [self.segments_dir(), self.output_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
            tracing::debug!("Ensured folder exists: {}", dir.display());
        }
        Ok(())
    }
}

/// File name of the form `<YYYYmmdd_HHMMSS>_<uuid8>.<ext>`.
pub fn timestamped_file_name(extension: &str) -> String {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}.{}", ts, &id[..8], extension)
}
