//! Last-seen playback position per video
//!
//! One store lives for the lifetime of the feed screen and is shared by every
//! session. Entries survive a session being torn down and recreated, which is
//! what makes scrolling back to a video resume where it left off.

use std::collections::HashMap;

use parking_lot::RwLock;
use vscroll_common::{PlaybackOffset, VideoId};

/// Mapping from video to its latest recorded offset
///
/// Writes for one key never touch another key's entry. Nothing is ever
/// pruned; the map is bounded by the number of distinct videos in the feed.
#[derive(Debug, Default)]
pub struct PositionStore {
    positions: RwLock<HashMap<VideoId, PlaybackOffset>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded offset, or `None` if the video was never recorded
    pub fn get(&self, video_id: &VideoId) -> Option<PlaybackOffset> {
        self.positions.read().get(video_id).copied()
    }

    /// Overwrite the offset for `video_id` unconditionally
    pub fn set(&self, video_id: &VideoId, offset: PlaybackOffset) {
        let mut positions = self.positions.write();
        match positions.get_mut(video_id) {
            Some(existing) => *existing = offset,
            None => {
                positions.insert(video_id.clone(), offset);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.read().is_empty()
    }

    /// Copy of every entry
    pub fn snapshot(&self) -> HashMap<VideoId, PlaybackOffset> {
        self.positions.read().clone()
    }
}
