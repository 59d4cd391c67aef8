//! Highlight detections and windows.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event category reported by the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum HighlightCategory {
    Goal,
    NearMiss,
    GreatSave,
    SkillfulPlay,
    FoulOrCard,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HighlightCategory {
    /// All categories the model is asked to choose from.
    pub const PROMPTED: [HighlightCategory; 5] = [
        HighlightCategory::Goal,
        HighlightCategory::NearMiss,
        HighlightCategory::GreatSave,
        HighlightCategory::SkillfulPlay,
        HighlightCategory::FoulOrCard,
    ];

    /// Human-readable label, as used in the prompt.
    pub fn label(&self) -> &'static str {
        match self {
            HighlightCategory::Goal => "Goal",
            HighlightCategory::NearMiss => "Near miss",
            HighlightCategory::GreatSave => "Great save",
            HighlightCategory::SkillfulPlay => "Skillful play",
            HighlightCategory::FoulOrCard => "Foul or card",
            HighlightCategory::Unknown => "Unknown",
        }
    }

    /// Map a free-form label from the model onto a category.
    ///
    /// Matching is case-insensitive and ignores separators, so "near-miss",
    /// "Near Miss" and "near_miss" all map to [`HighlightCategory::NearMiss`].
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "goal" | "goals" => HighlightCategory::Goal,
            "nearmiss" | "nearmisses" | "chance" | "bigchance" => HighlightCategory::NearMiss,
            "greatsave" | "save" | "saves" => HighlightCategory::GreatSave,
            "skillfulplay" | "skilfulplay" | "skill" | "skillfulplays" => {
                HighlightCategory::SkillfulPlay
            }
            s if s.contains("foul") || s.contains("card") => HighlightCategory::FoulOrCard,
            _ => HighlightCategory::Unknown,
        }
    }
}

impl fmt::Display for HighlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One candidate highlight reported by the model for a single segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Seconds from the start of the segment
    pub relative_timestamp: f64,

    /// Reported event category
    #[serde(default)]
    pub category: HighlightCategory,

    /// Model confidence in [0, 1]
    #[serde(default)]
    pub confidence: f64,
}

impl Detection {
    /// Create a detection, clamping confidence into [0, 1].
    pub fn new(relative_timestamp: f64, category: HighlightCategory, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            relative_timestamp,
            category,
            confidence,
        }
    }

    /// Detection with only a timestamp (category unknown, confidence 0).
    pub fn at(relative_timestamp: f64) -> Self {
        Self::new(relative_timestamp, HighlightCategory::Unknown, 0.0)
    }
}

/// Padded time range around a highlight instant, clamped to the video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightWindow {
    /// The highlight instant this window surrounds (absolute seconds)
    pub instant: f64,
    /// Window start (absolute seconds)
    pub clip_start: f64,
    /// Window end (absolute seconds)
    pub clip_end: f64,
}

impl HighlightWindow {
    /// Derive the window around `instant` with `buffer` seconds either side,
    /// clamped to `[0, video_duration]`.
    ///
    /// An instant slightly past either end still gets the part of its window
    /// that overlaps the video. Returns `None` when nothing of the window is
    /// left or the inputs are not finite.
    pub fn around(instant: f64, buffer: f64, video_duration: f64) -> Option<Self> {
        if !instant.is_finite() || !buffer.is_finite() || !video_duration.is_finite() {
            return None;
        }

        let buffer = buffer.max(0.0);
        let clip_start = (instant - buffer).max(0.0);
        let clip_end = (instant + buffer).min(video_duration);
        if clip_end <= clip_start {
            return None;
        }

        Some(Self {
            instant,
            clip_start,
            clip_end,
        })
    }

    /// Window length in seconds.
    pub fn duration(&self) -> f64 {
        self.clip_end - self.clip_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_label() {
        assert_eq!(HighlightCategory::from_label("Goal"), HighlightCategory::Goal);
        assert_eq!(HighlightCategory::from_label("near-miss"), HighlightCategory::NearMiss);
        assert_eq!(HighlightCategory::from_label("Near miss"), HighlightCategory::NearMiss);
        assert_eq!(HighlightCategory::from_label("GREAT SAVE"), HighlightCategory::GreatSave);
        assert_eq!(HighlightCategory::from_label("Skillful play"), HighlightCategory::SkillfulPlay);
        assert_eq!(HighlightCategory::from_label("Fouls or cards"), HighlightCategory::FoulOrCard);
        assert_eq!(HighlightCategory::from_label("Yellow card"), HighlightCategory::FoulOrCard);
        assert_eq!(HighlightCategory::from_label("throw-in"), HighlightCategory::Unknown);
    }

    #[test]
    fn test_category_serde_unknown_fallback() {
        let cat: HighlightCategory = serde_json::from_str(r#""corner_kick""#).unwrap();
        assert_eq!(cat, HighlightCategory::Unknown);
        let cat: HighlightCategory = serde_json::from_str(r#""near_miss""#).unwrap();
        assert_eq!(cat, HighlightCategory::NearMiss);
    }

    #[test]
    fn test_detection_clamps_confidence() {
        assert_eq!(Detection::new(1.0, HighlightCategory::Goal, 1.7).confidence, 1.0);
        assert_eq!(Detection::new(1.0, HighlightCategory::Goal, -0.2).confidence, 0.0);
        assert_eq!(Detection::new(1.0, HighlightCategory::Goal, f64::NAN).confidence, 0.0);
        assert_eq!(Detection::at(4.0).category, HighlightCategory::Unknown);
    }

    #[test]
    fn test_window_clamped_at_start() {
        let window = HighlightWindow::around(5.0, 5.0, 400.0).unwrap();
        assert_eq!(window.clip_start, 0.0);
        assert_eq!(window.clip_end, 10.0);
    }

    #[test]
    fn test_window_clamped_at_end() {
        let window = HighlightWindow::around(395.0, 5.0, 400.0).unwrap();
        assert_eq!(window.clip_start, 390.0);
        assert_eq!(window.clip_end, 400.0);
    }

    #[test]
    fn test_window_near_both_bounds() {
        let window = HighlightWindow::around(2.0, 5.0, 4.0).unwrap();
        assert_eq!(window.clip_start, 0.0);
        assert_eq!(window.clip_end, 4.0);
    }

    #[test]
    fn test_window_bounds_hold_across_inputs() {
        let duration = 650.0;
        for i in 0..=1300 {
            let instant = i as f64 * 0.5;
            for buffer in [0.5, 5.0, 30.0, 1000.0] {
                let w = HighlightWindow::around(instant, buffer, duration).unwrap();
                assert!(0.0 <= w.clip_start);
                assert!(w.clip_start <= instant);
                assert!(instant <= w.clip_end);
                assert!(w.clip_end <= duration);
            }
        }
    }

    #[test]
    fn test_window_is_deterministic() {
        let a = HighlightWindow::around(123.4, 5.0, 400.0);
        let b = HighlightWindow::around(123.4, 5.0, 400.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_window_keeps_overshoot_within_buffer() {
        let window = HighlightWindow::around(652.0, 5.0, 650.0).unwrap();
        assert_eq!((window.clip_start, window.clip_end), (647.0, 650.0));
        assert_eq!(window.instant, 652.0);

        let window = HighlightWindow::around(-1.0, 5.0, 400.0).unwrap();
        assert_eq!((window.clip_start, window.clip_end), (0.0, 4.0));
    }

    #[test]
    fn test_window_rejects_instant_beyond_buffer() {
        assert!(HighlightWindow::around(655.0, 5.0, 650.0).is_none());
        assert!(HighlightWindow::around(700.0, 5.0, 650.0).is_none());
        assert!(HighlightWindow::around(-5.0, 5.0, 400.0).is_none());
        assert!(HighlightWindow::around(100.0, 0.0, 400.0).is_none());
        assert!(HighlightWindow::around(f64::NAN, 5.0, 400.0).is_none());
        assert!(HighlightWindow::around(0.0, 5.0, 0.0).is_none());
    }
}
