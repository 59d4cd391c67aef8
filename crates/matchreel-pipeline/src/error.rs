//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Video segmentation failed")]
    SegmentationFailed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Analysis task failed: {0}")]
    TaskFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] matchreel_media::MediaError),

    #[error("Inference error: {0}")]
    Inference(#[from] matchreel_inference::InferenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmentation_failed_message() {
        assert_eq!(
            PipelineError::SegmentationFailed.to_string(),
            "Video segmentation failed"
        );
    }

    #[test]
    fn test_from_media_error() {
        let err: PipelineError = matchreel_media::MediaError::EmptyConcatenation.into();
        assert!(matches!(err, PipelineError::Media(_)));
    }
}
