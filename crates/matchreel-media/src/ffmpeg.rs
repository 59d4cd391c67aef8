//! FFmpeg-backed [`VideoSource`] and [`Concatenator`].

use async_trait::async_trait;
use matchreel_models::EncodingConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_parent, move_file, partial_path, remove_if_exists};
use crate::probe::probe_video;
use crate::source::{ConcatenatedClip, Concatenator, Subclip, VideoHandle, VideoSource};

/// Video operations implemented with the `ffmpeg`/`ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegVideo {
    runner: FfmpegRunner,
}

impl FfmpegVideo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any single FFmpeg invocation running longer than `secs`.
    pub fn with_timeout(secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(secs),
        }
    }

    /// Run `cmd` into the staging path of `output`, then publish it.
    async fn run_staged(&self, cmd: FfmpegCommand, output: &Path) -> MediaResult<()> {
        let staged = cmd.output_path().to_path_buf();
        match self.runner.run(&cmd).await {
            Ok(()) => move_file(&staged, output).await,
            Err(e) => {
                remove_if_exists(&staged).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl VideoSource for FfmpegVideo {
    async fn open(&self, path: &Path) -> MediaResult<VideoHandle> {
        let info = probe_video(path).await?;
        debug!(
            path = %path.display(),
            duration = info.duration,
            fps = info.fps,
            has_audio = info.has_audio,
            "Opened video"
        );
        Ok(VideoHandle::new(path, info))
    }

    async fn subclip(&self, handle: &VideoHandle, start: f64, end: f64) -> MediaResult<Subclip> {
        handle.range(start, end)
    }

    async fn write(
        &self,
        clip: &Subclip,
        output: &Path,
        encoding: &EncodingConfig,
    ) -> MediaResult<()> {
        ensure_parent(output).await?;

        let cmd = FfmpegCommand::new(&clip.source, partial_path(output))
            .seek(clip.start)
            .duration(clip.duration())
            .map_video_and_audio()
            .output_args(encoding.to_ffmpeg_args(clip.has_audio))
            .faststart()
            .format("mp4");

        self.run_staged(cmd, output).await?;
        debug!(
            output = %output.display(),
            start = clip.start,
            end = clip.end,
            "Wrote subclip"
        );
        Ok(())
    }

    async fn close(&self, handle: VideoHandle) {
        // Probing holds no process or descriptor open past `open`.
        debug!(path = %handle.path.display(), "Closed video");
    }
}

#[async_trait]
impl Concatenator for FfmpegVideo {
    async fn concatenate(&self, parts: Vec<Subclip>) -> MediaResult<ConcatenatedClip> {
        if parts.is_empty() {
            return Err(MediaError::EmptyConcatenation);
        }
        Ok(ConcatenatedClip { parts })
    }

    async fn write_concatenated(
        &self,
        clip: &ConcatenatedClip,
        output: &Path,
        encoding: &EncodingConfig,
    ) -> MediaResult<()> {
        if clip.parts.is_empty() {
            return Err(MediaError::EmptyConcatenation);
        }
        ensure_parent(output).await?;

        let mut entries = Vec::with_capacity(clip.parts.len());
        for part in &clip.parts {
            let path = tokio::fs::canonicalize(&part.source)
                .await
                .map_err(|_| MediaError::FileNotFound(part.source.clone()))?;
            entries.push((path, part));
        }

        let list_path = concat_list_path(output);
        tokio::fs::write(&list_path, render_concat_list(&entries)).await?;

        let with_audio = clip.has_audio();
        let cmd = FfmpegCommand::new(&list_path, partial_path(output))
            .concat_input()
            .map_video_and_audio()
            .output_args(encoding.to_ffmpeg_args(with_audio))
            .faststart()
            .format("mp4");

        let result = self.run_staged(cmd, output).await;
        remove_if_exists(&list_path).await;
        result?;

        info!(
            output = %output.display(),
            parts = clip.parts.len(),
            duration = clip.duration(),
            with_audio,
            "Wrote concatenated clip"
        );
        Ok(())
    }
}

fn concat_list_path(output: &Path) -> PathBuf {
    let name = format!(".concat-{}.txt", uuid::Uuid::new_v4().simple());
    output.with_file_name(name)
}

/// Render a concat demuxer script. Parts that do not cover their whole file
/// are trimmed with `inpoint`/`outpoint`.
fn render_concat_list(entries: &[(PathBuf, &Subclip)]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for (path, part) in entries {
        list.push_str(&format!("file '{}'\n", escape_concat_path(path)));
        if part.start > 0.0 {
            list.push_str(&format!("inpoint {:.3}\n", part.start));
        }
        list.push_str(&format!("outpoint {:.3}\n", part.end));
    }
    list
}

/// Single quotes cannot be escaped inside a quoted concat path; close the
/// quote, emit an escaped quote, reopen.
fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
