//! Highlight reel assembly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use matchreel_media::{Concatenator, MediaResult, Subclip, VideoHandle, VideoSource};
use matchreel_models::{EncodingConfig, HighlightWindow};

use crate::config::timestamped_file_name;
use crate::metrics;

/// Windows around each instant, in input order. An instant whose window
/// does not overlap the video produces no window.
pub fn highlight_windows(instants: &[f64], buffer: f64, video_duration: f64) -> Vec<Option<HighlightWindow>> {
    instants
        .iter()
        .map(|&instant| HighlightWindow::around(instant, buffer, video_duration))
        .collect()
}

/// Cuts a window around every highlight instant and joins them into a reel.
pub struct ReelAssembler {
    source: Arc<dyn VideoSource>,
    concatenator: Arc<dyn Concatenator>,
    output_dir: PathBuf,
    reel_encoding: EncodingConfig,
    part_encoding: EncodingConfig,
}

impl ReelAssembler {
    pub fn new(
        source: Arc<dyn VideoSource>,
        concatenator: Arc<dyn Concatenator>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            concatenator,
            output_dir: output_dir.into(),
            reel_encoding: EncodingConfig::for_reel(),
            part_encoding: EncodingConfig::for_intermediate(),
        }
    }

    pub fn with_reel_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.reel_encoding = encoding;
        self
    }

    /// Build the reel for `instants` (sorted, source time) with `buffer`
    /// seconds either side of each.
    ///
    /// Returns the reel path, or `None` when there is nothing to assemble or
    /// no reel could be written.
    pub async fn assemble(&self, video: &Path, instants: &[f64], buffer: f64) -> Option<PathBuf> {
        if instants.is_empty() {
            warn!("No highlights to process");
            return None;
        }

        info!(
            "Creating highlights video from {}: {} instants, {}s buffer",
            video.display(),
            instants.len(),
            buffer
        );
        let started = Instant::now();

        let handle = match self.source.open(video).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Highlight creation failed, cannot open {}: {}", video.display(), e);
                return None;
            }
        };
        info!(
            duration = handle.duration(),
            fps = handle.frame_rate(),
            has_audio = handle.has_audio(),
            "Original video loaded"
        );

        let reel = self.build_reel(&handle, instants, buffer).await;
        self.source.close(handle).await;

        info!(
            "Highlight creation completed in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        reel
    }

    async fn build_reel(&self, handle: &VideoHandle, instants: &[f64], buffer: f64) -> Option<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            error!("Cannot create output folder {}: {}", self.output_dir.display(), e);
            return None;
        }

        // Parts live here until the reel is written; dropping it removes them.
        let scratch = match tempfile::Builder::new()
            .prefix(".parts-")
            .tempdir_in(&self.output_dir)
        {
            Ok(dir) => dir,
            Err(e) => {
                error!("Cannot create scratch folder: {}", e);
                return None;
            }
        };

        let parts = self.extract_parts(handle, instants, buffer, &scratch).await;
        if parts.is_empty() {
            warn!("No valid highlight clips to concatenate");
            return None;
        }

        let output = self.output_dir.join(timestamped_file_name("mp4"));
        match self.join_parts(parts, &output).await {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to concatenate highlights: {}", e);
                return None;
            }
        }

        if handle.has_audio() {
            self.check_audio(&output).await;
        }

        Some(output)
    }

    async fn extract_parts(
        &self,
        handle: &VideoHandle,
        instants: &[f64],
        buffer: f64,
        scratch: &TempDir,
    ) -> Vec<Subclip> {
        let windows = highlight_windows(instants, buffer, handle.duration());
        let mut parts = Vec::with_capacity(windows.len());

        for (i, (instant, window)) in instants.iter().zip(windows).enumerate() {
            let Some(window) = window else {
                metrics::record_window("dropped");
                warn!(
                    "Dropping highlight #{} at {:.2}s: window misses the {:.2}s video",
                    i + 1,
                    instant,
                    handle.duration()
                );
                continue;
            };

            info!(
                "Highlight #{}: timestamp={:.2}s, extracting {:.2}s to {:.2}s (duration: {:.2}s)",
                i + 1,
                window.instant,
                window.clip_start,
                window.clip_end,
                window.duration()
            );

            let path = scratch.path().join(format!("part_{:04}.mp4", i));
            match self.extract_window(handle, &window, &path).await {
                Ok(part) => {
                    metrics::record_window("extracted");
                    debug!("Highlight #{} extracted, has audio: {}", i + 1, part.has_audio);
                    parts.push(part);
                }
                Err(e) => {
                    metrics::record_window("dropped");
                    error!("Failed to extract highlight #{}: {}", i + 1, e);
                }
            }
        }

        parts
    }

    async fn extract_window(
        &self,
        handle: &VideoHandle,
        window: &HighlightWindow,
        path: &Path,
    ) -> MediaResult<Subclip> {
        let clip = self
            .source
            .subclip(handle, window.clip_start, window.clip_end)
            .await?;
        self.source.write(&clip, path, &self.part_encoding).await?;
        Ok(Subclip::whole(path, clip.duration(), clip.has_audio))
    }

    async fn join_parts(&self, parts: Vec<Subclip>, output: &Path) -> MediaResult<()> {
        info!("Concatenating {} highlight clips...", parts.len());
        let joined = self.concatenator.concatenate(parts).await?;
        info!(
            "Concatenation successful: duration={:.2}s, has_audio={}",
            joined.duration(),
            joined.has_audio()
        );

        info!("Writing final highlights video to {}", output.display());
        self.concatenator
            .write_concatenated(&joined, output, &self.reel_encoding)
            .await
    }

    /// Warn when the reel lost the source's audio.
    async fn check_audio(&self, output: &Path) {
        match self.source.open(output).await {
            Ok(written) => {
                info!("Final output has audio: {}", written.has_audio());
                if !written.has_audio() {
                    warn!("Audio was lost during highlight creation");
                }
                self.source.close(written).await;
            }
            Err(e) => warn!("Could not re-open reel for audio check: {}", e),
        }
    }
}
