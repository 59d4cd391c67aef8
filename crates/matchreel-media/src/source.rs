//! Video source and concatenation capabilities.
//!
//! The pipeline only talks to video through these traits. Handles are plain
//! values: a [`Subclip`] describes a time range of a file and costs nothing
//! until it is written, so dropping one is always enough to release it.

use async_trait::async_trait;
use matchreel_models::EncodingConfig;
use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// An opened video file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoHandle {
    pub path: PathBuf,
    pub info: VideoInfo,
}

impl VideoHandle {
    pub fn new(path: impl Into<PathBuf>, info: VideoInfo) -> Self {
        Self {
            path: path.into(),
            info,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    pub fn frame_rate(&self) -> f64 {
        self.info.fps
    }

    pub fn has_audio(&self) -> bool {
        self.info.has_audio
    }

    /// Validate `[start, end]` against this video and describe it as a subclip.
    pub fn range(&self, start: f64, end: f64) -> MediaResult<Subclip> {
        let duration = self.duration();
        let valid = start.is_finite()
            && end.is_finite()
            && start >= 0.0
            && end > start
            && end <= duration;
        if !valid {
            return Err(MediaError::InvalidRange {
                start,
                end,
                duration,
            });
        }
        Ok(Subclip {
            source: self.path.clone(),
            start,
            end,
            has_audio: self.has_audio(),
        })
    }
}

/// A time range of a source file, in that file's time base.
#[derive(Debug, Clone, PartialEq)]
pub struct Subclip {
    pub source: PathBuf,
    pub start: f64,
    pub end: f64,
    pub has_audio: bool,
}

impl Subclip {
    /// A subclip covering a whole file of known duration.
    pub fn whole(source: impl Into<PathBuf>, duration: f64, has_audio: bool) -> Self {
        Self {
            source: source.into(),
            start: 0.0,
            end: duration,
            has_audio,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered subclips joined into one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatenatedClip {
    pub parts: Vec<Subclip>,
}

impl ConcatenatedClip {
    pub fn duration(&self) -> f64 {
        self.parts.iter().map(Subclip::duration).sum()
    }

    /// Audio is kept only if every part carries it.
    pub fn has_audio(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|p| p.has_audio)
    }
}

/// Open, cut and write video files.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Open a video and read its duration, frame rate and audio presence.
    async fn open(&self, path: &Path) -> MediaResult<VideoHandle>;

    /// Describe the `[start, end]` range of an opened video.
    async fn subclip(&self, handle: &VideoHandle, start: f64, end: f64) -> MediaResult<Subclip>;

    /// Encode a subclip into a standalone file at `output`.
    async fn write(
        &self,
        clip: &Subclip,
        output: &Path,
        encoding: &EncodingConfig,
    ) -> MediaResult<()>;

    /// Release an opened video.
    async fn close(&self, handle: VideoHandle);
}

/// Join subclips into one file.
#[async_trait]
pub trait Concatenator: Send + Sync {
    /// Join `parts` in order. Fails on an empty list.
    async fn concatenate(&self, parts: Vec<Subclip>) -> MediaResult<ConcatenatedClip>;

    /// Encode a joined clip into `output`.
    async fn write_concatenated(
        &self,
        clip: &ConcatenatedClip,
        output: &Path,
        encoding: &EncodingConfig,
    ) -> MediaResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(duration: f64, has_audio: bool) -> VideoHandle {
        VideoHandle::new(
            "/videos/match.mp4",
            VideoInfo {
                duration,
                width: 1280,
                height: 720,
                fps: 25.0,
                codec: "h264".to_string(),
                has_audio,
            },
        )
    }

    #[test]
    fn test_range_accepts_bounds() {
        let clip = tokio_test::assert_ok!(handle(650.0, true).range(600.0, 650.0));
        assert_eq!(clip.duration(), 50.0);
        assert!(clip.has_audio);
        assert_eq!(clip.source, PathBuf::from("/videos/match.mp4"));
    }

    #[test]
    fn test_range_rejects_invalid() {
        let h = handle(400.0, false);
        assert!(matches!(h.range(10.0, 10.0), Err(MediaError::InvalidRange { .. })));
        assert!(matches!(h.range(-1.0, 5.0), Err(MediaError::InvalidRange { .. })));
        assert!(matches!(h.range(390.0, 400.5), Err(MediaError::InvalidRange { .. })));
        assert!(matches!(h.range(f64::NAN, 5.0), Err(MediaError::InvalidRange { .. })));
    }

    #[test]
    fn test_concatenated_audio_requires_every_part() {
        let with = Subclip::whole("/a.mp4", 10.0, true);
        let without = Subclip::whole("/b.mp4", 10.0, false);

        let clip = ConcatenatedClip {
            parts: vec![with.clone(), with.clone()],
        };
        assert!(clip.has_audio());
        assert_eq!(clip.duration(), 20.0);

        let mixed = ConcatenatedClip {
            parts: vec![with, without],
        };
        assert!(!mixed.has_audio());
        assert!(!ConcatenatedClip { parts: vec![] }.has_audio());
    }
}
