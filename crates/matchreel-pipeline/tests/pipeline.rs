//! End-to-end runs of the pipeline controller against in-memory media and
//! inference fakes.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use matchreel_inference::InferenceError;
use matchreel_models::ProgressUpdate;
use matchreel_pipeline::testing::{FakeInference, FakeVideo};
use matchreel_pipeline::{Pipeline, PipelineConfig};

const MATCH: &str = "/videos/match.mp4";

fn config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        work_dir: dir.path().join("football_highlights"),
        inference_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn pipeline(config: PipelineConfig, video: &Arc<FakeVideo>, inference: FakeInference) -> Pipeline {
    Pipeline::new(config, video.clone(), video.clone(), Arc::new(inference))
}

/// Answers with one highlight per segment, keyed on the segment's start.
fn scripted_inference() -> FakeInference {
    FakeInference::new(|media| {
        Ok(match media.start as u64 {
            0 => r#"[{"timestamp_seconds": 5.0, "event_type": "Goal", "confidence_score": 0.9}]"#,
            300 => r#"```json
[{"timestamp_seconds": 10.5, "event_type": "Great save", "confidence_score": 0.8}]
```"#,
            _ => "Nothing of note in this segment.",
        }
        .to_string())
    })
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<ProgressUpdate>>>);

impl Recorder {
    fn sink(&self) -> impl Fn(ProgressUpdate) + Send + Sync {
        let updates = Arc::clone(&self.0);
        move |update| updates.lock().unwrap().push(update)
    }

    fn updates(&self) -> Vec<ProgressUpdate> {
        self.0.lock().unwrap().clone()
    }

    fn messages(&self) -> Vec<String> {
        self.updates().into_iter().map(|u| u.message).collect()
    }
}

#[tokio::test]
async fn test_full_run_builds_reel() {
    let dir = TempDir::new().unwrap();
    let video = Arc::new(FakeVideo::new());
    video.add_video(MATCH, 650.0, true);
    let config = config(&dir);
    let output_dir = config.output_dir();

    let result = pipeline(config, &video, scripted_inference())
        .run(Path::new(MATCH))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert!(result.error.is_none());

    let bounds: Vec<(f64, f64)> = result
        .segments
        .iter()
        .map(|s| (s.start_offset, s.end_offset))
        .collect();
    assert_eq!(bounds, vec![(0.0, 300.0), (300.0, 600.0), (600.0, 650.0)]);

    assert_eq!(result.highlight_timestamps, vec![5.0, 310.5]);
    assert_eq!(result.formatted_timestamps(), vec!["00:05", "05:10"]);

    let reel = result.highlights_video.expect("reel");
    assert!(reel.exists());
    assert!(reel.starts_with(&output_dir));

    let windows: Vec<(f64, f64)> = video.written_ranges()[3..].to_vec();
    assert_eq!(windows, vec![(0.0, 10.0), (305.5, 315.5)]);
    assert_eq!(video.last_concatenation().unwrap().len(), 2);
}

#[tokio::test]
async fn test_progress_is_staged_and_non_decreasing() {
    let dir = TempDir::new().unwrap();
    let video = Arc::new(FakeVideo::new());
    video.add_video(MATCH, 650.0, true);
    let recorder = Recorder::default();

    let result = pipeline(config(&dir), &video, scripted_inference())
        .run_with_progress(Path::new(MATCH), &recorder.sink())
        .await;
    assert!(result.success);

    let updates = recorder.updates();
    let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert_eq!(percents.first(), Some(&5));
    assert_eq!(percents.last(), Some(&100));

    let steps: Vec<u8> = updates.iter().map(|u| u.step).collect();
    assert!(steps.windows(2).all(|w| w[0] <= w[1]), "{:?}", steps);

    let messages = recorder.messages();
    for expected in [
        "Segmenting video...",
        "Video segmented into 3 parts",
        "Analyzing segments for highlights...",
        "Found 2 highlights",
        "Creating highlights video...",
        "Highlights video created successfully",
        "Process complete",
    ] {
        assert!(messages.iter().any(|m| m == expected), "missing {:?} in {:?}", expected, messages);
    }

    // Three segments cross checkpoints 3, 6 and 8 of 9
    let analysis: Vec<u8> = updates
        .iter()
        .filter(|u| u.message.starts_with("Analyzed "))
        .map(|u| u.percent)
        .collect();
    assert_eq!(analysis, vec![38, 41, 45, 48, 51, 55, 58, 61]);
}

#[tokio::test]
async fn test_unreadable_video_fails_segmentation() {
    let dir = TempDir::new().unwrap();
    let video = Arc::new(FakeVideo::new());
    let inference = FakeInference::new(|_| Ok("[]".to_string()));
    let recorder = Recorder::default();

    let result = pipeline(config(&dir), &video, inference)
        .run_with_progress(Path::new("/videos/corrupt.mp4"), &recorder.sink())
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Video segmentation failed"));
    assert!(result.segments.is_empty());
    assert!(result.highlight_timestamps.is_empty());
    assert!(result.highlights_video.is_none());

    let last = recorder.updates().pop().unwrap();
    assert_eq!((last.step, last.percent), (1, 100));
    assert_eq!(last.message, "Video segmentation failed");
}

#[tokio::test]
async fn test_all_inference_failures_still_succeed() {
    let dir = TempDir::new().unwrap();
    let video = Arc::new(FakeVideo::new());
    video.add_video(MATCH, 650.0, true);
    let inference = FakeInference::new(|_| Err(InferenceError::from_status(503, "overloaded")));
    let recorder = Recorder::default();

    let result = pipeline(config(&dir), &video, inference)
        .run_with_progress(Path::new(MATCH), &recorder.sink())
        .await;

    assert!(result.success);
    assert_eq!(result.segments.len(), 3);
    assert!(result.highlight_timestamps.is_empty());
    assert!(result.highlights_video.is_none());
    assert!(video.last_concatenation().is_none());
    assert!(recorder.messages().iter().any(|m| m == "No highlights detected"));
}

#[tokio::test]
async fn test_concatenation_failure_keeps_highlights() {
    let dir = TempDir::new().unwrap();
    let video = Arc::new(FakeVideo::new());
    video.add_video(MATCH, 650.0, true);
    video.fail_concatenation();
    let recorder = Recorder::default();

    let result = pipeline(config(&dir), &video, scripted_inference())
        .run_with_progress(Path::new(MATCH), &recorder.sink())
        .await;

    assert!(result.success);
    assert_eq!(result.highlight_timestamps, vec![5.0, 310.5]);
    assert!(result.highlights_video.is_none());
    assert!(recorder
        .messages()
        .iter()
        .any(|m| m == "Failed to create highlights video"));
}

#[tokio::test]
async fn test_invalid_config_is_reported_as_failure() {
    let dir = TempDir::new().unwrap();
    let video = Arc::new(FakeVideo::new());
    video.add_video(MATCH, 650.0, true);
    let config = PipelineConfig {
        segment_length_secs: 0.0,
        ..config(&dir)
    };
    let recorder = Recorder::default();

    let result = pipeline(config, &video, scripted_inference())
        .run_with_progress(Path::new(MATCH), &recorder.sink())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("Configuration error"));
    assert_eq!(video.opens.load(std::sync::atomic::Ordering::SeqCst), 0);

    let last = recorder.updates().pop().unwrap();
    assert_eq!((last.step, last.percent), (3, 100));
    assert!(last.message.starts_with("Error: "));
}

#[tokio::test]
async fn test_handles_are_released() {
    let dir = TempDir::new().unwrap();
    let video = Arc::new(FakeVideo::new());
    video.add_video(MATCH, 650.0, true);

    pipeline(config(&dir), &video, scripted_inference())
        .run(Path::new(MATCH))
        .await;

    let opens = video.opens.load(std::sync::atomic::Ordering::SeqCst);
    let closes = video.closes.load(std::sync::atomic::Ordering::SeqCst);
    assert!(opens > 0);
    assert_eq!(opens, closes);
}
