//! Media collaborators
//!
//! The feed core never touches decoding or rendering. It talks to two
//! platform capabilities through these traits:
//!
//! - [`AssetLoader`]: asynchronously determines whether a resource locator
//!   can start playback (the readiness probe's backend).
//! - [`MediaPlayer`]: one transport-controlled player handle per session.
//!
//! Implementations bundled here are [`HttpAssetLoader`] (metadata probe over
//! HTTP) and the simulated loader/player used by the demo host.

pub mod http;
pub mod simulated;

pub use http::HttpAssetLoader;
pub use simulated::{SimulatedAssetLoader, SimulatedPlayer, SimulatedPlayerFactory};

use futures::future::BoxFuture;
use vscroll_common::{PlaybackOffset, VideoId};

use crate::error::ProbeError;
use crate::playback::signal::PlayerEventSink;

/// Metadata produced by a successful readiness probe
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedAsset {
    pub video_id: VideoId,
    /// Total length, when the backend reports one
    pub duration: Option<PlaybackOffset>,
}

impl PreparedAsset {
    pub fn new(video_id: VideoId) -> Self {
        Self {
            video_id,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: PlaybackOffset) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Resolves whether a resource is ready for playback
///
/// The returned future runs off the control loop; it must not capture
/// borrowed state.
pub trait AssetLoader: Send + Sync + 'static {
    fn load_playable(&self, video_id: &VideoId)
        -> BoxFuture<'static, Result<PreparedAsset, ProbeError>>;
}

/// Item handed to a player on attach
///
/// `events` is how the player reports completion or failure of this item.
/// Reports made through a sink whose session has since been deactivated are
/// discarded by the controller.
#[derive(Debug)]
pub struct PlayerItem {
    pub asset: PreparedAsset,
    pub events: PlayerEventSink,
}

/// Transport controls of a platform media player
///
/// All calls are made from the control loop.
pub trait MediaPlayer: Send {
    /// Attach a new item, or detach with `None`
    fn replace_current_item(&mut self, item: Option<PlayerItem>);
    /// Report on `events` from now on, keeping the attached item
    ///
    /// Reports already sent through the previous sink are left to the
    /// controller to discard.
    fn rebind_events(&mut self, events: PlayerEventSink);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, offset: PlaybackOffset);
    /// Current playback position of the attached item
    fn current_time(&self) -> PlaybackOffset;
    /// Stop any network fetch tied to the attached item
    fn cancel_loading(&mut self);
}

/// Creates one player handle per session
pub trait PlayerFactory: Send + Sync {
    fn create(&self, video_id: &VideoId) -> Box<dyn MediaPlayer>;
}

impl<F> PlayerFactory for F
where
    F: Fn(&VideoId) -> Box<dyn MediaPlayer> + Send + Sync,
{
    fn create(&self, video_id: &VideoId) -> Box<dyn MediaPlayer> {
        self(video_id)
    }
}
