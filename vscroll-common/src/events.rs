//! Event types for the feed event system
//!
//! Provides the FeedEvent enum and the EventBus that distributes it.

use crate::video::{PlaybackOffset, VideoId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Outcome of a readiness probe as reported to event subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    Ready,
    Failed,
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Ready => write!(f, "ready"),
            ProbeOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Feed event types
///
/// Events are broadcast via EventBus and can be serialized for any host
/// transport (logs, debugging overlays, remote inspectors).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// A feed item became visible and its session started probing
    SessionActivated {
        video_id: VideoId,
        timestamp: DateTime<Utc>,
    },

    /// A readiness probe reached a terminal state
    ProbeResolved {
        video_id: VideoId,
        outcome: ProbeOutcome,
        timestamp: DateTime<Utc>,
    },

    /// The resource was attached and playback started
    ///
    /// `resumed_from` is the stored offset the player was positioned at,
    /// if one existed.
    PlaybackStarted {
        video_id: VideoId,
        resumed_from: Option<PlaybackOffset>,
        timestamp: DateTime<Utc>,
    },

    /// A position tick was recorded
    PositionRecorded {
        video_id: VideoId,
        position: PlaybackOffset,
        timestamp: DateTime<Utc>,
    },

    /// Playback reached the natural end of the video
    VideoCompleted {
        video_id: VideoId,
        timestamp: DateTime<Utc>,
    },

    /// Probe or playback failed
    VideoFailed {
        video_id: VideoId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A replay was requested and applied
    ReplayRequested {
        video_id: VideoId,
        timestamp: DateTime<Utc>,
    },

    /// The item left the visibility window
    SessionDeactivated {
        video_id: VideoId,
        last_position: Option<PlaybackOffset>,
        timestamp: DateTime<Utc>,
    },
}

impl FeedEvent {
    /// Video the event refers to
    pub fn video_id(&self) -> &VideoId {
        match self {
            FeedEvent::SessionActivated { video_id, .. }
            | FeedEvent::ProbeResolved { video_id, .. }
            | FeedEvent::PlaybackStarted { video_id, .. }
            | FeedEvent::PositionRecorded { video_id, .. }
            | FeedEvent::VideoCompleted { video_id, .. }
            | FeedEvent::VideoFailed { video_id, .. }
            | FeedEvent::ReplayRequested { video_id, .. }
            | FeedEvent::SessionDeactivated { video_id, .. } => video_id,
        }
    }

    /// Short name of the event variant, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::SessionActivated { .. } => "session_activated",
            FeedEvent::ProbeResolved { .. } => "probe_resolved",
            FeedEvent::PlaybackStarted { .. } => "playback_started",
            FeedEvent::PositionRecorded { .. } => "position_recorded",
            FeedEvent::VideoCompleted { .. } => "video_completed",
            FeedEvent::VideoFailed { .. } => "video_failed",
            FeedEvent::ReplayRequested { .. } => "replay_requested",
            FeedEvent::SessionDeactivated { .. } => "session_deactivated",
        }
    }
}

/// Central event distribution bus for feed events
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the control loop)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use vscroll_common::events::{EventBus, FeedEvent};
/// use vscroll_common::VideoId;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(FeedEvent::SessionActivated {
///     video_id: VideoId::new("v1"),
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.kind(), "session_activated");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FeedEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: FeedEvent) -> Result<usize, broadcast::error::SendError<FeedEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FeedEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
