//! Timestamp parsing and formatting.
//!
//! Model responses are not always disciplined about timestamp format, so
//! parsing accepts plain seconds (`45.2`, `45.2s`), `MM:SS` and `HH:MM:SS`,
//! each optionally with a fractional part.

use thiserror::Error;

/// Maximum reasonable video duration (24 hours in seconds).
pub const MAX_VIDEO_DURATION_SECS: f64 = 86400.0;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use SS, MM:SS or HH:MM:SS")]
    InvalidFormat(String),

    #[error("Timestamp exceeds maximum allowed duration ({} hours)", .0 / 3600.0)]
    ExceedsMaxDuration(f64),
}

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use matchreel_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("45.5s").unwrap(), 45.5);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = strip_unit(ts.trim());
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').map(str::trim).collect();
    let labels: &[&'static str] = match parts.len() {
        1 => &["seconds"],
        2 => &["minutes", "seconds"],
        3 => &["hours", "minutes", "seconds"],
        _ => return Err(TimestampError::InvalidFormat(ts.to_string())),
    };

    let mut total = 0.0;
    for (part, label) in parts.iter().zip(labels) {
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(label, part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(label, part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    if total > MAX_VIDEO_DURATION_SECS {
        return Err(TimestampError::ExceedsMaxDuration(MAX_VIDEO_DURATION_SECS));
    }

    Ok(total)
}

fn strip_unit(ts: &str) -> &str {
    for suffix in ["seconds", "second", "secs", "sec", "s"] {
        if let Some(stripped) = ts.strip_suffix(suffix) {
            return stripped.trim_end();
        }
    }
    ts
}

/// Format seconds as `MM:SS`, truncating fractions. Minutes are not wrapped
/// into hours, matching how match clocks are read.
pub fn format_clock(total_secs: f64) -> String {
    let whole = total_secs.max(0.0).floor() as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_hh_mm_ss() {
        assert_eq!(parse_timestamp("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_timestamp("01:00:00").unwrap(), 3600.0);
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_timestamp_mm_ss() {
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("1:02.5").unwrap(), 62.5);
    }

    #[test]
    fn test_parse_timestamp_seconds_with_unit() {
        assert_eq!(tokio_test::assert_ok!(parse_timestamp("90")), 90.0);
        assert_eq!(parse_timestamp("45.2s").unwrap(), 45.2);
        assert_eq!(parse_timestamp("120 seconds").unwrap(), 120.0);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert!(matches!(parse_timestamp(""), Err(TimestampError::Empty)));
        assert!(matches!(parse_timestamp("  "), Err(TimestampError::Empty)));
        assert!(matches!(parse_timestamp("abc"), Err(TimestampError::InvalidValue(_, _))));
        assert!(matches!(parse_timestamp("1:2:3:4"), Err(TimestampError::InvalidFormat(_))));
        assert!(matches!(parse_timestamp("-3"), Err(TimestampError::Negative)));
        assert!(matches!(parse_timestamp("inf"), Err(TimestampError::InvalidValue(_, _))));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(59.9), "00:59");
        assert_eq!(format_clock(310.5), "05:10");
        assert_eq!(format_clock(5400.0), "90:00");
    }
}
