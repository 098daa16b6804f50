//! Video identifiers and playback offsets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Opaque key for one feed video (in practice its resource locator)
///
/// Cheap to clone; immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(Arc<str>);

impl VideoId {
    pub fn new(locator: impl AsRef<str>) -> Self {
        Self(Arc::from(locator.as_ref()))
    }

    /// The resource locator this identifier names
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VideoId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Playback position in seconds
///
/// Always finite and non-negative: negative or non-finite inputs are clamped
/// to zero on construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaybackOffset(f64);

impl PlaybackOffset {
    pub const ZERO: PlaybackOffset = PlaybackOffset(0.0);

    pub fn from_secs(seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            Self(seconds)
        } else {
            Self(0.0)
        }
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl From<Duration> for PlaybackOffset {
    fn from(value: Duration) -> Self {
        Self::from_secs(value.as_secs_f64())
    }
}

impl fmt::Display for PlaybackOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::human_time::format_offset(*self))
    }
}
