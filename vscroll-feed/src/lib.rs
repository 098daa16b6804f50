//! # VScroll Feed Core (vscroll-feed)
//!
//! Playback coordination for a vertically scrolling feed of videos.
//!
//! **Purpose:** Track per-video playback positions, gate playback on an
//! asynchronous readiness probe, and drive one player per visible feed item
//! so that a video left mid-way resumes where it stopped.
//!
//! **Architecture:** A single control loop ([`feed::FeedController`]) owns
//! every [`playback::PlaybackSession`]. Probes, tick timers and player
//! reports run as tokio tasks and deliver token-stamped signals back to the
//! loop, where results from a superseded activation are discarded.
//!
//! Platform media is reached through the [`media::AssetLoader`] and
//! [`media::MediaPlayer`] traits.

pub mod error;
pub mod feed;
pub mod media;
pub mod playback;

pub use error::{Error, Result};
pub use feed::{FeedController, FeedHandle, FeedOp};
pub use playback::{PositionStore, SessionOptions, SessionSinks, SessionState};
