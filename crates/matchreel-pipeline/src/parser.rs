//! Parsing of model responses into detections.
//!
//! Two tiers: the structured tier reads the JSON list between the first `[`
//! and the last `]`; when there is no such list, or it does not parse at all,
//! the line scanner looks for `label: <seconds>` lines.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use matchreel_models::{parse_timestamp, Detection, HighlightCategory};

const TIMESTAMP_KEYS: [&str; 4] = ["timestamp_seconds", "timestamp", "time", "seconds"];
const CATEGORY_KEYS: [&str; 3] = ["event_type", "category", "event"];
const CONFIDENCE_KEYS: [&str; 2] = ["confidence_score", "confidence"];

/// `label: 45.2,` style lines, value optionally quoted or suffixed with a unit.
static SECONDS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^[^:]*:\s*"?(?P<secs>\d+(?:\.\d+)?)\s*(?:s|secs?|seconds?)?"?\s*(?:,|$)"#)
        .unwrap()
});

/// Which parser produced the detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Structured,
    LineScan,
}

impl ParseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseTier::Structured => "structured",
            ParseTier::LineScan => "line_scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub detections: Vec<Detection>,
    pub tier: ParseTier,
}

/// Parse a model response. Never fails; unusable content yields no detections.
pub fn parse_response(text: &str) -> ParsedResponse {
    let text = strip_code_fences(text.trim());

    if let Some(list) = bracketed(text) {
        debug!("JSON structure found in response");
        match serde_json::from_str::<Vec<Value>>(list) {
            Ok(items) => {
                return ParsedResponse {
                    detections: detections_from_items(&items),
                    tier: ParseTier::Structured,
                };
            }
            Err(e) => {
                warn!("Failed to parse JSON list, falling back to line scan: {}", e);
                debug!("Problematic JSON: {}", list);
            }
        }
    } else {
        warn!("No JSON structure found in response, falling back to line scan");
    }

    ParsedResponse {
        detections: scan_lines(text),
        tier: ParseTier::LineScan,
    }
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````).
fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Text from the first `[` to the last `]`, inclusive.
fn bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

fn detections_from_items(items: &[Value]) -> Vec<Detection> {
    let mut detections = Vec::with_capacity(items.len());

    for (idx, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            warn!("Skipping highlight {}: not an object", idx + 1);
            continue;
        };

        let Some(raw_ts) = TIMESTAMP_KEYS.iter().find_map(|k| obj.get(*k)) else {
            warn!("Skipping highlight {}: missing timestamp_seconds field", idx + 1);
            continue;
        };

        let Some(relative) = timestamp_value(raw_ts) else {
            warn!("Skipping highlight {}: unusable timestamp {}", idx + 1, raw_ts);
            continue;
        };

        let category = CATEGORY_KEYS
            .iter()
            .find_map(|k| obj.get(*k))
            .and_then(Value::as_str)
            .map(HighlightCategory::from_label)
            .unwrap_or_default();

        let confidence = CONFIDENCE_KEYS
            .iter()
            .find_map(|k| obj.get(*k))
            .and_then(number_value)
            .unwrap_or(0.0);

        let detection = Detection::new(relative, category, confidence);
        info!(
            "Highlight #{}: {} at {:.2}s (confidence: {:.2})",
            idx + 1,
            detection.category,
            detection.relative_timestamp,
            detection.confidence
        );
        detections.push(detection);
    }

    detections
}

/// Seconds from a JSON number or a timestamp string ("45.2", "01:30").
fn timestamp_value(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_timestamp(s).ok()?,
        _ => return None,
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scan_lines(text: &str) -> Vec<Detection> {
    let mut detections = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        if !line.contains(':') || !line.to_lowercase().contains("second") {
            continue;
        }

        let parsed = SECONDS_LINE
            .captures(line.trim())
            .and_then(|caps| caps.name("secs"))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        match parsed {
            Some(relative) => {
                info!("Highlight found in line {} at {:.2}s", line_num + 1, relative);
                detections.push(Detection::at(relative));
            }
            None => warn!("Failed to parse line {}: {}", line_num + 1, line.trim()),
        }
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamps(parsed: &ParsedResponse) -> Vec<f64> {
        parsed.detections.iter().map(|d| d.relative_timestamp).collect()
    }

    #[test]
    fn test_structured_response() {
        let parsed = parse_response(
            r#"Here are the highlights:
            [
              {"timestamp_seconds": 45.2, "event_type": "Goal", "confidence_score": 0.95},
              {"timestamp_seconds": 120.7, "event_type": "Great save", "confidence_score": 0.85}
            ]
            Let me know if you need more."#,
        );

        assert_eq!(parsed.tier, ParseTier::Structured);
        assert_eq!(timestamps(&parsed), vec![45.2, 120.7]);
        assert_eq!(parsed.detections[0].category, HighlightCategory::Goal);
        assert_eq!(parsed.detections[1].category, HighlightCategory::GreatSave);
        assert_eq!(parsed.detections[1].confidence, 0.85);
    }

    #[test]
    fn test_structured_defaults_and_skips() {
        let parsed = parse_response(
            r#"[
              {"timestamp_seconds": 10},
              {"event_type": "Goal", "confidence_score": 0.9},
              {"timestamp_seconds": "01:05", "event_type": "Yellow card", "confidence_score": "0.4"},
              {"timestamp_seconds": -3, "event_type": "Goal"},
              "not an object"
            ]"#,
        );

        assert_eq!(parsed.tier, ParseTier::Structured);
        assert_eq!(timestamps(&parsed), vec![10.0, 65.0]);
        assert_eq!(parsed.detections[0].category, HighlightCategory::Unknown);
        assert_eq!(parsed.detections[0].confidence, 0.0);
        assert_eq!(parsed.detections[1].category, HighlightCategory::FoulOrCard);
        assert_eq!(parsed.detections[1].confidence, 0.4);
    }

    #[test]
    fn test_empty_list_is_structured() {
        let parsed = parse_response("[]");
        assert_eq!(parsed.tier, ParseTier::Structured);
        assert!(parsed.detections.is_empty());
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let parsed = parse_response("```json\n[{\"timestamp_seconds\": 12.5}]\n```");
        assert_eq!(timestamps(&parsed), vec![12.5]);
    }

    #[test]
    fn test_line_scan_without_brackets() {
        let parsed = parse_response(
            "Goal detected\n\
             timestamp_seconds: 45.2, event_type: Goal\n\
             Save at seconds: 88\n\
             seconds: about a minute\n\
             nothing here: 12",
        );

        assert_eq!(parsed.tier, ParseTier::LineScan);
        assert_eq!(timestamps(&parsed), vec![45.2, 88.0]);
        assert!(parsed
            .detections
            .iter()
            .all(|d| d.category == HighlightCategory::Unknown && d.confidence == 0.0));
    }

    #[test]
    fn test_line_scan_after_broken_json() {
        let parsed = parse_response(
            "[{\"timestamp_seconds\": 30, \"event_type\": \"Goal\",\n\
             \"timestamp_seconds\": 95.5,\n\
             oops]",
        );

        assert_eq!(parsed.tier, ParseTier::LineScan);
        assert_eq!(timestamps(&parsed), vec![30.0, 95.5]);
    }

    #[test]
    fn test_unusable_response_yields_nothing() {
        for text in ["", "I could not find any highlights.", "]["] {
            assert!(parse_response(text).detections.is_empty(), "{:?}", text);
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]```"), "[1]");
        assert_eq!(strip_code_fences("[1]"), "[1]");
    }
}
