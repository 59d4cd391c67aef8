//! In-memory stand-ins for the media and inference capabilities.
//!
//! [`FakeVideo`] writes small marker files instead of encoding video. Each
//! marker records the source range it was cut from, so [`FakeInference`] can
//! answer per segment without real media.
//!
//! Built for unit tests and, with the `testing` feature, for integration
//! tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use matchreel_inference::{InferenceError, InferenceResult, VisionInference};
use matchreel_media::{
    ConcatenatedClip, Concatenator, MediaError, MediaResult, Subclip, VideoHandle, VideoInfo,
    VideoSource,
};
use matchreel_models::{EncodingConfig, Segment};

const MARKER_PREFIX: &str = "fake-clip";

/// Source range recorded in a marker file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeMedia {
    pub start: f64,
    pub end: f64,
}

impl FakeMedia {
    fn encode(start: f64, end: f64) -> String {
        format!("{} {} {}", MARKER_PREFIX, start, end)
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        let mut fields = text.split_whitespace();
        if fields.next()? != MARKER_PREFIX {
            return None;
        }
        let start = fields.next()?.parse().ok()?;
        let end = fields.next()?.parse().ok()?;
        Some(Self { start, end })
    }
}

/// Write a marker segment file for `[start, end)` into `dir`.
pub async fn write_segment_file(
    dir: &Path,
    index: usize,
    start: f64,
    end: f64,
) -> std::io::Result<Segment> {
    let path = dir.join(format!("segment_{:03}.mp4", index));
    tokio::fs::write(&path, FakeMedia::encode(start, end)).await?;
    Ok(Segment::new(index, path, start, end))
}

/// Fake [`VideoSource`] and [`Concatenator`].
#[derive(Default)]
pub struct FakeVideo {
    videos: Mutex<HashMap<PathBuf, (f64, bool)>>,
    failing_starts: Mutex<Vec<f64>>,
    drop_audio: AtomicBool,
    fail_concat: AtomicBool,
    writes: Mutex<Vec<(f64, f64)>>,
    concatenations: Mutex<Vec<Vec<Subclip>>>,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeVideo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` openable with the given duration and audio presence.
    pub fn add_video(&self, path: impl Into<PathBuf>, duration: f64, has_audio: bool) {
        lock(&self.videos).insert(path.into(), (duration, has_audio));
    }

    /// Fail every write of a clip starting at `start`.
    pub fn fail_write_at(&self, start: f64) {
        lock(&self.failing_starts).push(start);
    }

    /// Written files have no audio track.
    pub fn drop_audio_on_write(&self) {
        self.drop_audio.store(true, Ordering::SeqCst);
    }

    pub fn fail_concatenation(&self) {
        self.fail_concat.store(true, Ordering::SeqCst);
    }

    /// Source ranges of every successful `write`, in call order.
    pub fn written_ranges(&self) -> Vec<(f64, f64)> {
        lock(&self.writes).clone()
    }

    /// Parts of the most recent successful concatenation.
    pub fn last_concatenation(&self) -> Option<Vec<Subclip>> {
        lock(&self.concatenations).last().cloned()
    }

    async fn write_marker(&self, output: &Path, start: f64, end: f64, has_audio: bool) -> MediaResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, FakeMedia::encode(start, end)).await?;
        let keeps_audio = has_audio && !self.drop_audio.load(Ordering::SeqCst);
        self.add_video(output, end - start, keeps_audio);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl VideoSource for FakeVideo {
    async fn open(&self, path: &Path) -> MediaResult<VideoHandle> {
        let (duration, has_audio) = lock(&self.videos)
            .get(path)
            .copied()
            .ok_or_else(|| MediaError::FileNotFound(path.to_path_buf()))?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(VideoHandle::new(
            path,
            VideoInfo {
                duration,
                width: 1280,
                height: 720,
                fps: 25.0,
                codec: "h264".to_string(),
                has_audio,
            },
        ))
    }

    async fn subclip(&self, handle: &VideoHandle, start: f64, end: f64) -> MediaResult<Subclip> {
        handle.range(start, end)
    }

    async fn write(&self, clip: &Subclip, output: &Path, _encoding: &EncodingConfig) -> MediaResult<()> {
        if lock(&self.failing_starts).contains(&clip.start) {
            return Err(MediaError::ffmpeg_failed("simulated encode failure", None, Some(1)));
        }
        self.write_marker(output, clip.start, clip.end, clip.has_audio).await?;
        lock(&self.writes).push((clip.start, clip.end));
        Ok(())
    }

    async fn close(&self, _handle: VideoHandle) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Concatenator for FakeVideo {
    async fn concatenate(&self, parts: Vec<Subclip>) -> MediaResult<ConcatenatedClip> {
        if parts.is_empty() {
            return Err(MediaError::EmptyConcatenation);
        }
        if self.fail_concat.load(Ordering::SeqCst) {
            return Err(MediaError::ffmpeg_failed("simulated concat failure", None, Some(1)));
        }
        lock(&self.concatenations).push(parts.clone());
        Ok(ConcatenatedClip { parts })
    }

    async fn write_concatenated(
        &self,
        clip: &ConcatenatedClip,
        output: &Path,
        _encoding: &EncodingConfig,
    ) -> MediaResult<()> {
        self.write_marker(output, 0.0, clip.duration(), clip.has_audio()).await
    }
}

type Responder = dyn Fn(&FakeMedia) -> InferenceResult<String> + Send + Sync;
type Latency = dyn Fn(&FakeMedia) -> Duration + Send + Sync;

/// Fake [`VisionInference`] answering from the marker in the media bytes.
pub struct FakeInference {
    respond: Box<Responder>,
    latency: Option<Box<Latency>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: Arc<AtomicUsize>,
}

impl FakeInference {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&FakeMedia) -> InferenceResult<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            latency: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay each answer by `latency(media)`.
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&FakeMedia) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Box::new(latency));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `infer` calls seen.
    pub fn peak_concurrency_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

#[async_trait]
impl VisionInference for FakeInference {
    async fn infer(&self, media: &[u8], _mime_type: &str, _instruction: &str) -> InferenceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let media = FakeMedia::decode(media)
            .ok_or_else(|| InferenceError::from_status(400, "unreadable media"))?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(&media)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(&media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_round_trip() {
        let bytes = FakeMedia::encode(300.0, 600.5);
        assert_eq!(
            FakeMedia::decode(bytes.as_bytes()),
            Some(FakeMedia { start: 300.0, end: 600.5 })
        );
        assert!(FakeMedia::decode(b"\x00\x00\x00 ftyp").is_none());
    }
}
