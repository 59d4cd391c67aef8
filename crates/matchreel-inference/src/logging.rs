//! Request/response logging for inference calls.

use std::time::Duration;
use tracing::{debug, info};

/// Longest response text written to the log.
pub const MAX_LOGGED_RESPONSE_CHARS: usize = 1000;

/// Longest instruction preview written to the log.
const MAX_LOGGED_PROMPT_CHARS: usize = 500;

pub fn log_api_request(model: &str, instruction: &str, media_bytes: usize) {
    info!(model, multimodal = media_bytes > 0, media_bytes, "Inference request");
    debug!("Inference prompt: {}", truncate(instruction, MAX_LOGGED_PROMPT_CHARS));
}

pub fn log_api_response(model: &str, text: &str, elapsed: Duration) {
    info!(
        model,
        elapsed_secs = elapsed.as_secs_f64(),
        response_chars = text.chars().count(),
        "Inference response received"
    );
    debug!("Inference response: {}", truncate(text, MAX_LOGGED_RESPONSE_CHARS));
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
