//! Human-readable playback offset formatting
//!
//! Used for log lines and the host's end-of-run summary, so that an offset
//! like `2712.4` reads as `45:12.4s`.

use crate::video::PlaybackOffset;

/// Format selection thresholds (seconds)
const SHORT_FORMAT_MAX: f64 = 100.0; // < 100s → X.XXs
const SHORT_FORMAT_CEILING: f64 = 99.99;
const MEDIUM_FORMAT_MAX: f64 = 6000.0; // < 100m → M:SS.Xs
                                       // >= 100m → H:MM:SS

/// Format a playback offset by magnitude.
///
/// - Short format (`X.XXs`): below 100 seconds
/// - Medium format (`M:SS.Xs`): 100 seconds to 100 minutes
/// - Long format (`H:MM:SS`): 100 minutes and above
///
/// # Examples
///
/// ```
/// use vscroll_common::human_time::format_offset;
/// use vscroll_common::PlaybackOffset;
///
/// assert_eq!(format_offset(PlaybackOffset::from_secs(42.0)), "42.00s");
/// assert_eq!(format_offset(PlaybackOffset::from_secs(330.5)), "5:30.5s");
/// assert_eq!(format_offset(PlaybackOffset::from_secs(7261.0)), "2:01:01");
/// ```
pub fn format_offset(offset: PlaybackOffset) -> String {
    format_seconds(offset.as_secs())
}

/// Format an optional offset, `"none"` when absent
pub fn format_offset_opt(offset: Option<PlaybackOffset>) -> String {
    match offset {
        Some(offset) => format_offset(offset),
        None => "none".to_string(),
    }
}

fn format_seconds(seconds: f64) -> String {
    if seconds < SHORT_FORMAT_MAX {
        // Values that would round up to "100.00s" stay in the short format
        format!("{:.2}s", seconds.min(SHORT_FORMAT_CEILING))
    } else if seconds < MEDIUM_FORMAT_MAX {
        // Truncate to tenths so 59.96 never renders as "60.0"
        let tenths = (seconds * 10.0).floor() as u64;
        let minutes = tenths / 600;
        let secs = (tenths % 600) as f64 / 10.0;
        format!("{}:{:04.1}s", minutes, secs)
    } else {
        let whole = seconds.floor() as u64;
        let hours = whole / 3600;
        let mins = (whole % 3600) / 60;
        let secs = whole % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}
