//! Football highlight reel pipeline.
//!
//! This crate provides:
//! - Fixed-length segmentation of the source video
//! - Per-segment highlight detection with a vision-language model
//! - Parallel analysis across segments
//! - Reel assembly from padded highlight windows
//! - The run controller with staged progress reporting

pub mod assembler;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod progress;
pub mod segmenter;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use assembler::{highlight_windows, ReelAssembler};
pub use config::PipelineConfig;
pub use controller::Pipeline;
pub use coordinator::AnalysisCoordinator;
pub use detector::HighlightDetector;
pub use error::{PipelineError, PipelineResult};
pub use logging::{init_tracing, RunLogger};
pub use parser::{parse_response, ParseTier, ParsedResponse};
pub use progress::{ChannelProgress, NoopProgress, ProgressSink};
pub use segmenter::{plan_segments, Segmenter};
