//! Highlight reel command-line front-end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use matchreel_inference::GeminiClient;
use matchreel_models::RunResult;
use matchreel_pipeline::{init_tracing, ChannelProgress, Pipeline, PipelineConfig};

/// Build a highlight reel from a football match video.
#[derive(Debug, Parser)]
#[command(name = "matchreel", version, about)]
struct Args {
    /// Match video to process
    video: PathBuf,

    /// Segment length in seconds
    #[arg(long)]
    segment_length: Option<f64>,

    /// Seconds kept either side of each highlight
    #[arg(long)]
    buffer: Option<f64>,

    /// Folder holding segments/ and output/
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Maximum concurrent inference calls (0 = unbounded)
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Write a debug log file into this folder (defaults to $LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the run result as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(secs) = self.segment_length {
            config.segment_length_secs = secs;
        }
        if let Some(secs) = self.buffer {
            config.highlight_buffer_secs = secs;
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(n) = self.max_parallel {
            config.max_parallel_analyses = n;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| std::env::var_os("LOG_DIR").map(PathBuf::from));
    if let Some(path) = init_tracing(log_dir.as_deref())? {
        info!("Debug log: {}", path.display());
    }

    let mut config = PipelineConfig::from_env();
    args.apply(&mut config);
    info!("Pipeline config: {:?}", config);

    if let Err(e) = matchreel_media::check_ffmpeg() {
        warn!("{}", e);
    }

    let client = GeminiClient::from_env().context("failed to configure Gemini client")?;
    let pipeline = Pipeline::with_ffmpeg(config, Arc::new(client));

    let (sink, mut updates) = ChannelProgress::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            eprintln!("[{:>3}%] {}", update.percent, update.status_line());
        }
    });

    let result = tokio::select! {
        result = pipeline.run_with_progress(&args.video, &sink) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, aborting run");
            std::process::exit(130);
        }
    };

    drop(sink);
    printer.await.ok();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    if !result.success {
        println!(
            "Error: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        return;
    }

    println!("Highlight timestamps:");
    for (i, ts) in result.formatted_timestamps().iter().enumerate() {
        println!("  #{}: {}", i + 1, ts);
    }
    println!("Segments: {}", result.segments.len());
    println!("Highlights: {}", result.highlight_timestamps.len());
    println!("Processing time: {:.2}s", result.processing_time);
    match &result.highlights_video {
        Some(path) => println!("Highlights video: {}", path.display()),
        None => println!("Highlights video: not created"),
    }
}
