//! # VScroll Common Library
//!
//! Shared code for the video feed core and its hosts including:
//! - Video identifiers and playback offsets
//! - Error types
//! - Bootstrap configuration loading (TOML)
//! - Feed event types (FeedEvent enum) and the EventBus
//! - Human-readable playback offset formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod video;

pub use error::{Error, Result};
pub use video::{PlaybackOffset, VideoId};
