#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for the highlight pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - FFprobe-based stream inspection
//! - The [`VideoSource`] and [`Concatenator`] capabilities the pipeline
//!   consumes, plus their FFmpeg implementation [`FfmpegVideo`]

pub mod command;
pub mod error;
pub mod ffmpeg;
pub mod fs_utils;
pub mod probe;
pub mod source;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::FfmpegVideo;
pub use probe::{probe_video, VideoInfo};
pub use source::{ConcatenatedClip, Concatenator, Subclip, VideoHandle, VideoSource};
