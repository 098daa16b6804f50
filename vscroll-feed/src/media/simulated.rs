//! Simulated media backend
//!
//! Stands in for a platform player when running the demo host offline or
//! in tests. Time is tokio time, so tests with a paused clock drive it
//! deterministically.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};
use vscroll_common::{PlaybackOffset, VideoId};

use super::{AssetLoader, MediaPlayer, PlayerFactory, PlayerItem, PreparedAsset};
use crate::error::ProbeError;
use crate::playback::signal::PlayerEventSink;

const PLAYABLE_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "m3u8"];

/// Loader that accepts locators with a video file extension
#[derive(Debug, Clone)]
pub struct SimulatedAssetLoader {
    latency: Duration,
    duration: PlaybackOffset,
}

impl SimulatedAssetLoader {
    /// Every probe takes `latency` and reports `duration` for playable items
    pub fn new(latency: Duration, duration: PlaybackOffset) -> Self {
        Self { latency, duration }
    }

    fn extension(video_id: &VideoId) -> Option<String> {
        let path = video_id.as_str().split(['?', '#']).next().unwrap_or_default();
        let name = path.rsplit('/').next().unwrap_or_default();
        name.rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

impl AssetLoader for SimulatedAssetLoader {
    fn load_playable(
        &self,
        video_id: &VideoId,
    ) -> BoxFuture<'static, Result<PreparedAsset, ProbeError>> {
        let video_id = video_id.clone();
        let latency = self.latency;
        let duration = self.duration;
        async move {
            tokio::time::sleep(latency).await;
            match Self::extension(&video_id) {
                Some(ext) if PLAYABLE_EXTENSIONS.contains(&ext.as_str()) => {
                    Ok(PreparedAsset::new(video_id).with_duration(duration))
                }
                Some(ext) => Err(ProbeError::Unplayable {
                    reason: format!("unsupported extension .{}", ext),
                }),
                None => Err(ProbeError::Unplayable {
                    reason: "no file extension".to_string(),
                }),
            }
        }
        .boxed()
    }
}

/// Player whose position advances with the tokio clock
///
/// Reports completion through the attached item's event sink when the
/// position reaches the item duration.
pub struct SimulatedPlayer {
    video_id: VideoId,
    default_duration: PlaybackOffset,
    item: Option<PlayerItem>,
    duration: PlaybackOffset,
    base: PlaybackOffset,
    playing_since: Option<Instant>,
    end_timer: Option<JoinHandle<()>>,
}

impl SimulatedPlayer {
    /// `default_duration` applies to items whose asset reports none
    pub fn new(video_id: VideoId, default_duration: PlaybackOffset) -> Self {
        Self {
            video_id,
            default_duration,
            item: None,
            duration: default_duration,
            base: PlaybackOffset::ZERO,
            playing_since: None,
            end_timer: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    pub fn has_item(&self) -> bool {
        self.item.is_some()
    }

    fn clamp(&self, offset: PlaybackOffset) -> PlaybackOffset {
        PlaybackOffset::from_secs(offset.as_secs().min(self.duration.as_secs()))
    }

    fn stop_clock(&mut self) {
        self.base = self.current_time();
        self.playing_since = None;
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }

    fn start_clock(&mut self) {
        let Some(item) = &self.item else {
            return;
        };
        self.playing_since = Some(Instant::now());

        let remaining = (self.duration.as_secs() - self.base.as_secs()).max(0.0);
        let events = item.events.clone();
        let video_id = self.video_id.clone();
        self.end_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(remaining)).await;
            trace!("Simulated playback of {} reached the end", video_id);
            events.completed();
        }));
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn replace_current_item(&mut self, item: Option<PlayerItem>) {
        self.stop_clock();
        self.base = PlaybackOffset::ZERO;
        self.duration = item
            .as_ref()
            .and_then(|item| item.asset.duration)
            .unwrap_or(self.default_duration);
        self.item = item;
    }

    fn rebind_events(&mut self, events: PlayerEventSink) {
        if let Some(item) = &mut self.item {
            item.events = events;
            // Pending end timer holds the old sink
            if self.playing_since.is_some() {
                self.stop_clock();
                self.start_clock();
            }
        }
    }

    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.start_clock();
        }
    }

    fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.stop_clock();
        }
    }

    fn seek(&mut self, offset: PlaybackOffset) {
        let playing = self.playing_since.is_some();
        self.stop_clock();
        self.base = self.clamp(offset);
        if playing {
            self.start_clock();
        }
    }

    fn current_time(&self) -> PlaybackOffset {
        let elapsed = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.clamp(PlaybackOffset::from_secs(self.base.as_secs() + elapsed))
    }

    fn cancel_loading(&mut self) {
        debug!("Simulated player for {} canceled loading", self.video_id);
    }
}

impl Drop for SimulatedPlayer {
    fn drop(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }
}

/// Creates a [`SimulatedPlayer`] per session
#[derive(Debug, Clone, Copy)]
pub struct SimulatedPlayerFactory {
    default_duration: PlaybackOffset,
}

impl SimulatedPlayerFactory {
    pub fn new(default_duration: PlaybackOffset) -> Self {
        Self { default_duration }
    }
}

impl PlayerFactory for SimulatedPlayerFactory {
    fn create(&self, video_id: &VideoId) -> Box<dyn MediaPlayer> {
        Box::new(SimulatedPlayer::new(video_id.clone(), self.default_duration))
    }
}
