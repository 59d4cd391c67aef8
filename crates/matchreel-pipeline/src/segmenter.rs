//! Fixed-length segmentation of the source video.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use matchreel_media::{VideoHandle, VideoSource};
use matchreel_models::{EncodingConfig, Segment};

use crate::config::timestamped_file_name;
use crate::metrics;

/// Time ranges `[start, end)` covering `[0, duration)` in steps of
/// `segment_length`, the last one truncated to the remaining duration.
///
/// Returns no ranges for a non-positive or non-finite input.
pub fn plan_segments(duration: f64, segment_length: f64) -> Vec<(f64, f64)> {
    let valid = duration.is_finite()
        && segment_length.is_finite()
        && duration > 0.0
        && segment_length > 0.0;
    if !valid {
        return Vec::new();
    }

    let count = (duration / segment_length).ceil() as usize;
    (0..count)
        .map(|i| {
            let start = i as f64 * segment_length;
            let end = ((i + 1) as f64 * segment_length).min(duration);
            (start, end)
        })
        .collect()
}

/// Splits a source video into independently encoded segments.
pub struct Segmenter {
    source: Arc<dyn VideoSource>,
    segments_dir: PathBuf,
    encoding: EncodingConfig,
}

impl Segmenter {
    pub fn new(source: Arc<dyn VideoSource>, segments_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            segments_dir: segments_dir.into(),
            encoding: EncodingConfig::for_segments(),
        }
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// Split `video` into segments of `segment_length` seconds.
    ///
    /// A slice that fails to write is skipped. An empty result means the
    /// source could not be read or no slice could be written.
    pub async fn segment(&self, video: &Path, segment_length: f64) -> Vec<Segment> {
        info!("Starting video segmentation for {}", video.display());
        let started = Instant::now();

        let handle = match self.source.open(video).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Video segmentation failed, cannot open {}: {}", video.display(), e);
                return Vec::new();
            }
        };

        info!(
            duration = handle.duration(),
            fps = handle.frame_rate(),
            has_audio = handle.has_audio(),
            "Video loaded"
        );
        if !handle.has_audio() {
            warn!("Input video does not have an audio track");
        }

        let plan = plan_segments(handle.duration(), segment_length);
        if plan.is_empty() {
            error!(
                "Cannot split {:.2}s of video into {}s segments",
                handle.duration(),
                segment_length
            );
        }

        let total = plan.len();
        let mut segments = Vec::with_capacity(total);

        for (index, (start, end)) in plan.into_iter().enumerate() {
            info!(
                segment = index + 1,
                total,
                "Creating segment {}/{}: {:.2}s to {:.2}s",
                index + 1,
                total,
                start,
                end
            );

            match self.write_slice(&handle, index, start, end).await {
                Ok(segment) => {
                    metrics::record_segment("written");
                    segments.push(segment);
                }
                Err(e) => {
                    metrics::record_segment("failed");
                    error!(segment = index + 1, "Failed to create segment: {}", e);
                }
            }
        }

        self.source.close(handle).await;

        info!(
            "Video segmentation completed: {} of {} segments created in {:.2}s",
            segments.len(),
            total,
            started.elapsed().as_secs_f64()
        );
        segments
    }

    async fn write_slice(
        &self,
        handle: &VideoHandle,
        index: usize,
        start: f64,
        end: f64,
    ) -> matchreel_media::MediaResult<Segment> {
        let clip = self.source.subclip(handle, start, end).await?;
        let path = self.segments_dir.join(timestamped_file_name("mp4"));

        debug!(segment = index + 1, "Writing segment to {}", path.display());
        self.source.write(&clip, &path, &self.encoding).await?;

        if handle.has_audio() {
            self.check_audio(index, &path).await;
        }

        Ok(Segment::new(index, path, start, end))
    }

    /// Warn when a written slice lost the source's audio track.
    async fn check_audio(&self, index: usize, path: &Path) {
        match self.source.open(path).await {
            Ok(written) => {
                if written.has_audio() {
                    debug!(segment = index + 1, "Segment audio validation passed");
                } else {
                    warn!(
                        segment = index + 1,
                        "Segment is missing audio although the source has it"
                    );
                }
                self.source.close(written).await;
            }
            Err(e) => warn!(segment = index + 1, "Could not re-open segment for audio check: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVideo;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    #[test]
    fn test_plan_scenario_650_by_300() {
        assert_eq!(
            plan_segments(650.0, 300.0),
            vec![(0.0, 300.0), (300.0, 600.0), (600.0, 650.0)]
        );
    }

    #[test]
    fn test_plan_exact_multiple() {
        assert_eq!(plan_segments(600.0, 300.0), vec![(0.0, 300.0), (300.0, 600.0)]);
        assert_eq!(plan_segments(12.5, 300.0), vec![(0.0, 12.5)]);
    }

    #[test]
    fn test_plan_covers_duration_contiguously() {
        for &duration in &[0.5, 1.0, 299.9, 300.0, 300.1, 901.0, 5400.04, 7213.7] {
            for &length in &[1.0, 7.5, 60.0, 300.0, 1000.0] {
                let plan = plan_segments(duration, length);
                assert_eq!(plan.len(), (duration / length).ceil() as usize);
                assert_eq!(plan[0].0, 0.0);
                assert_eq!(plan.last().unwrap().1, duration);
                for pair in plan.windows(2) {
                    assert_eq!(pair[0].1, pair[1].0);
                }
                assert!(plan.iter().all(|(s, e)| e > s));
            }
        }
    }

    #[test]
    fn test_plan_rejects_invalid_input() {
        assert!(plan_segments(0.0, 300.0).is_empty());
        assert!(plan_segments(650.0, 0.0).is_empty());
        assert!(plan_segments(650.0, -5.0).is_empty());
        assert!(plan_segments(f64::NAN, 300.0).is_empty());
    }

    #[tokio::test]
    async fn test_segment_writes_each_slice() {
        let dir = TempDir::new().unwrap();
        let video = FakeVideo::new();
        video.add_video("/videos/match.mp4", 650.0, true);
        let video = Arc::new(video);

        let segmenter = Segmenter::new(video.clone(), dir.path());
        let segments = segmenter.segment(Path::new("/videos/match.mp4"), 300.0).await;

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].start_offset, 600.0);
        assert_eq!(segments[2].end_offset, 650.0);
        assert!(segments.iter().all(|s| s.path.exists() && s.path.starts_with(dir.path())));
        assert_eq!(video.opens.load(Ordering::SeqCst), video.closes.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_segment_skips_failed_slice() {
        let dir = TempDir::new().unwrap();
        let video = FakeVideo::new();
        video.add_video("/videos/match.mp4", 650.0, false);
        video.fail_write_at(300.0);
        let video = Arc::new(video);

        let segments = Segmenter::new(video.clone(), dir.path())
            .segment(Path::new("/videos/match.mp4"), 300.0)
            .await;

        let starts: Vec<f64> = segments.iter().map(|s| s.start_offset).collect();
        assert_eq!(starts, vec![0.0, 600.0]);
        assert_eq!(segments[1].index, 2);
    }

    #[tokio::test]
    async fn test_segment_unreadable_source_is_empty() {
        let dir = TempDir::new().unwrap();
        let video = Arc::new(FakeVideo::new());

        let segments = Segmenter::new(video.clone(), dir.path())
            .segment(Path::new("/videos/corrupt.mp4"), 300.0)
            .await;

        assert!(segments.is_empty());
        assert_eq!(video.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_segment_tolerates_lost_audio() {
        let dir = TempDir::new().unwrap();
        let video = FakeVideo::new();
        video.add_video("/videos/match.mp4", 120.0, true);
        video.drop_audio_on_write();
        let video = Arc::new(video);

        let segments = Segmenter::new(video.clone(), dir.path())
            .segment(Path::new("/videos/match.mp4"), 60.0)
            .await;

        assert_eq!(segments.len(), 2);
        assert_eq!(video.opens.load(Ordering::SeqCst), video.closes.load(Ordering::SeqCst));
    }
}
