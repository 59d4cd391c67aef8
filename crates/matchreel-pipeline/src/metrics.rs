//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

pub mod names {
    /// Segments written, by outcome.
    pub const SEGMENTS_TOTAL: &str = "matchreel_segments_total";

    /// Inference calls, by outcome.
    pub const INFERENCE_REQUESTS_TOTAL: &str = "matchreel_inference_requests_total";

    /// Inference latency in seconds.
    pub const INFERENCE_LATENCY_SECONDS: &str = "matchreel_inference_latency_seconds";

    /// Detections accepted, by parser tier.
    pub const DETECTIONS_TOTAL: &str = "matchreel_detections_total";

    /// Highlight windows, by outcome.
    pub const WINDOWS_TOTAL: &str = "matchreel_windows_total";

    /// Whole-run duration in seconds, by outcome.
    pub const RUN_DURATION_SECONDS: &str = "matchreel_run_duration_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_segment(outcome: &'static str) {
    counter!(names::SEGMENTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_inference(outcome: &'static str, latency_secs: f64) {
    counter!(names::INFERENCE_REQUESTS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::INFERENCE_LATENCY_SECONDS).record(latency_secs);
}

pub fn record_detections(tier: &'static str, count: usize) {
    counter!(names::DETECTIONS_TOTAL, "tier" => tier).increment(count as u64);
}

pub fn record_window(outcome: &'static str) {
    counter!(names::WINDOWS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_run(success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    histogram!(names::RUN_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}
