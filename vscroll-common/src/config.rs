//! Bootstrap configuration loading
//!
//! The feed configuration is read once at startup from a TOML file. Missing
//! keys fall back to built-in defaults, and a missing file falls back to the
//! defaults entirely.
//!
//! # Resolution order
//!
//! 1. Explicit path (command-line argument)
//! 2. `VSCROLL_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/vscroll/config.toml`)
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "VSCROLL_CONFIG";

/// Sample feed shown when no video list is configured
pub const SAMPLE_FEED: &[&str] = &[
    "https://storage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/ElephantsDream.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerEscapes.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerFun.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerJoyrides.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerMeltdowns.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/Sintel.jpg",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/SubaruOutbackOnStreetAndDirt.mp4",
    "https://storage.googleapis.com/gtv-videos-bucket/sample/TearsOfSteel.mp4",
];

/// Feed configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Interval between position ticks while a session is playing
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Start playback as soon as the readiness probe resolves Ready
    ///
    /// When false the resource is attached and positioned but left paused
    /// until the host resumes it.
    #[serde(default = "default_true")]
    pub autoplay_on_ready: bool,

    /// Map the host's tap gesture to an explicit replay request
    #[serde(default = "default_true")]
    pub tap_to_replay: bool,

    /// Upper bound on a single readiness probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Ordered resource locators making up the feed
    #[serde(default = "default_videos")]
    pub videos: Vec<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_videos() -> Vec<String> {
    SAMPLE_FEED.iter().map(|s| s.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            autoplay_on_ready: true,
            tap_to_replay: true,
            probe_timeout_ms: default_probe_timeout_ms(),
            videos: default_videos(),
            logging: LoggingConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Probe timeout as a Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FeedConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject values the feed core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::InvalidInput(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(Error::InvalidInput(
                "probe_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(blank) = self.videos.iter().position(|v| v.trim().is_empty()) {
            return Err(Error::InvalidInput(format!("videos[{}] is empty", blank)));
        }
        Ok(())
    }
}

/// Locates and loads the feed configuration
pub struct ConfigResolver {
    explicit: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver with an optional explicit path (command-line argument)
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    /// Path that would be loaded, if any candidate applies
    pub fn config_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        dirs::config_dir().map(|d| d.join("vscroll").join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists
    ///
    /// A malformed file is an error; a missing one is not.
    pub fn load(&self) -> Result<FeedConfig> {
        match self.config_path() {
            Some(path) if path.exists() => {
                info!("Loading feed configuration from {}", path.display());
                FeedConfig::from_file(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(FeedConfig::default())
            }
            None => {
                warn!("No config location available, using built-in defaults");
                Ok(FeedConfig::default())
            }
        }
    }
}
