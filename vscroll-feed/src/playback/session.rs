//! Per-item playback session
//!
//! A session owns one player handle for one feed item and drives it through
//!
//! ```text
//! Idle → Probing → Attached(Playing | Paused) → Ended
//!              └─→ Failed
//! ```
//!
//! All methods run on the control loop. Asynchronous work (readiness probe,
//! tick timer, player observation) reports back through [`SessionSignal`]s
//! stamped with the session's current [`SessionToken`]; [`deactivate`]
//! moves the session to a new generation, so results of the previous
//! activation can never attach, seek or play.
//!
//! [`deactivate`]: PlaybackSession::deactivate

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use vscroll_common::config::FeedConfig;
use vscroll_common::events::{EventBus, FeedEvent, ProbeOutcome};
use vscroll_common::{PlaybackOffset, VideoId};

use super::position::PositionStore;
use super::probe::{wait_terminal, ProbeHandle, ReadinessProbe, ReadinessState};
use super::signal::{GenerationSource, PlayerEventSink, SessionSignal, SessionToken, SignalSender};
use super::ticker::Ticker;
use crate::media::{MediaPlayer, PlayerItem, PreparedAsset};

/// Transport state while a resource is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Probing,
    Attached(PlayState),
    Ended,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Ended | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Probing => write!(f, "probing"),
            SessionState::Attached(PlayState::Playing) => write!(f, "playing"),
            SessionState::Attached(PlayState::Paused) => write!(f, "paused"),
            SessionState::Ended => write!(f, "ended"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Behavior switches shared by every session of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Interval between position ticks while playing
    pub tick_interval: Duration,
    /// Start playing as soon as the resource is attached
    pub autoplay_on_ready: bool,
    /// Honor explicit replay requests
    pub tap_to_replay: bool,
    /// Upper bound on one readiness probe
    pub probe_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&FeedConfig::default())
    }
}

impl From<&FeedConfig> for SessionOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            autoplay_on_ready: config.autoplay_on_ready,
            tap_to_replay: config.tap_to_replay,
            probe_timeout: config.probe_timeout(),
        }
    }
}

type Notify = Box<dyn FnMut() + Send>;

/// Completion and error callbacks supplied per session
///
/// Each is invoked on the control loop, at most once per play-through, and
/// never both for the same terminal transition.
pub struct SessionSinks {
    on_video_completed: Notify,
    on_video_error: Notify,
}

impl SessionSinks {
    pub fn new(
        on_video_completed: impl FnMut() + Send + 'static,
        on_video_error: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            on_video_completed: Box::new(on_video_completed),
            on_video_error: Box::new(on_video_error),
        }
    }

    /// Sinks that ignore both notifications
    pub fn noop() -> Self {
        Self::new(|| {}, || {})
    }
}

impl Default for SessionSinks {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for SessionSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSinks").finish_non_exhaustive()
    }
}

/// Collaborators shared by all sessions of one feed
#[derive(Clone)]
pub struct SessionEnv {
    pub store: Arc<PositionStore>,
    pub probe: ReadinessProbe,
    pub signals: SignalSender,
    pub events: EventBus,
    pub generations: GenerationSource,
    pub options: SessionOptions,
}

/// Whether a delivered signal changed the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    /// Signal belonged to an earlier activation or no longer applies
    Stale,
}

/// Probe plus the task relaying its resolution onto the control loop
struct InFlightProbe {
    handle: ProbeHandle,
    relay: JoinHandle<()>,
}

impl InFlightProbe {
    fn start(probe: &ReadinessProbe, video_id: &VideoId, token: SessionToken, tx: SignalSender) -> Self {
        let handle = probe.probe(video_id);
        let mut rx = handle.subscribe();
        let relay = tokio::spawn(async move {
            let state = wait_terminal(&mut rx).await;
            let _ = tx.send(SessionSignal::ProbeResolved { token, state });
        });
        Self { handle, relay }
    }

    fn cancel(self) {
        self.handle.cancel();
    }
}

impl Drop for InFlightProbe {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

/// Controller for one feed item's player
pub struct PlaybackSession {
    slot: usize,
    video_id: VideoId,
    env: SessionEnv,
    player: Box<dyn MediaPlayer>,
    sinks: SessionSinks,
    state: SessionState,
    readiness: ReadinessState,
    generation: u64,
    probe: Option<InFlightProbe>,
    ticker: Option<Ticker>,
    terminal_notified: bool,
}

impl PlaybackSession {
    pub fn new(
        slot: usize,
        video_id: VideoId,
        player: Box<dyn MediaPlayer>,
        sinks: SessionSinks,
        env: SessionEnv,
    ) -> Self {
        let generation = env.generations.next();
        Self {
            slot,
            video_id,
            env,
            player,
            sinks,
            state: SessionState::Idle,
            readiness: ReadinessState::Unknown,
            generation,
            probe: None,
            ticker: None,
            terminal_notified: false,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn readiness(&self) -> &ReadinessState {
        &self.readiness
    }

    /// Token that current asynchronous work is stamped with
    pub fn token(&self) -> SessionToken {
        SessionToken {
            slot: self.slot,
            generation: self.generation,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Item became visible: start probing readiness
    ///
    /// Only valid from Idle; returns false otherwise.
    pub fn activate(&mut self) -> bool {
        if self.state != SessionState::Idle {
            debug!(
                "Ignoring activate for {} in state {}",
                self.video_id, self.state
            );
            return false;
        }

        self.generation = self.env.generations.next();
        self.terminal_notified = false;
        let token = self.token();
        self.probe = Some(InFlightProbe::start(
            &self.env.probe,
            &self.video_id,
            token,
            self.env.signals.clone(),
        ));
        self.readiness = ReadinessState::Probing;
        self.state = SessionState::Probing;

        info!("Session {} activated for {}, probing readiness", token, self.video_id);
        self.env.events.emit_lossy(FeedEvent::SessionActivated {
            video_id: self.video_id.clone(),
            timestamp: Utc::now(),
        });
        true
    }

    /// Item left the visibility window
    ///
    /// Pauses the player, releases the attached resource and cancels the
    /// probe and tick timer. Nothing from the previous activation is applied
    /// after this returns. The stored position is kept.
    pub fn deactivate(&mut self) -> bool {
        if self.state == SessionState::Idle {
            return false;
        }

        let previous = self.token();
        self.generation = self.env.generations.next();

        if let Some(probe) = self.probe.take() {
            probe.cancel();
        }
        self.ticker = None;
        self.player.pause();
        self.player.cancel_loading();
        self.player.replace_current_item(None);

        let from_state = self.state;
        self.state = SessionState::Idle;
        self.readiness = ReadinessState::Unknown;

        let last_position = self.env.store.get(&self.video_id);
        info!(
            "Session {} deactivated for {} (was {}, last position {})",
            previous,
            self.video_id,
            from_state,
            vscroll_common::human_time::format_offset_opt(last_position)
        );
        self.env.events.emit_lossy(FeedEvent::SessionDeactivated {
            video_id: self.video_id.clone(),
            last_position,
            timestamp: Utc::now(),
        });
        true
    }

    /// Explicit replay request (tap)
    ///
    /// From Attached or Ended: restart from zero and play. The stored
    /// position is reset to zero so a later resume never returns to the
    /// pre-replay offset. The session moves to a new generation, so end or
    /// failure reports and ticks from the previous play-through are stale.
    pub fn replay(&mut self) -> bool {
        if !self.env.options.tap_to_replay {
            debug!("Replay disabled, ignoring request for {}", self.video_id);
            return false;
        }
        match self.state {
            SessionState::Attached(_) | SessionState::Ended => {}
            state => {
                debug!("Ignoring replay for {} in state {}", self.video_id, state);
                return false;
            }
        }

        self.generation = self.env.generations.next();
        self.player
            .rebind_events(PlayerEventSink::new(self.token(), self.env.signals.clone()));

        self.env.store.set(&self.video_id, PlaybackOffset::ZERO);
        self.player.seek(PlaybackOffset::ZERO);
        self.player.play();
        self.state = SessionState::Attached(PlayState::Playing);
        self.terminal_notified = false;
        self.start_ticker();

        info!("Replaying {} from the start", self.video_id);
        self.env.events.emit_lossy(FeedEvent::ReplayRequested {
            video_id: self.video_id.clone(),
            timestamp: Utc::now(),
        });
        true
    }

    /// Host pause: Attached(Playing) → Attached(Paused)
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Attached(PlayState::Playing) {
            return false;
        }
        self.player.pause();
        self.ticker = None;
        self.state = SessionState::Attached(PlayState::Paused);
        debug!("Paused {}", self.video_id);
        true
    }

    /// Host resume: Attached(Paused) → Attached(Playing)
    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Attached(PlayState::Paused) {
            return false;
        }
        self.player.play();
        self.state = SessionState::Attached(PlayState::Playing);
        self.start_ticker();

        let position = self.player.current_time();
        debug!("Resumed {} at {}", self.video_id, position);
        self.env.events.emit_lossy(FeedEvent::PlaybackStarted {
            video_id: self.video_id.clone(),
            resumed_from: Some(position),
            timestamp: Utc::now(),
        });
        true
    }

    /// Apply an asynchronous result
    pub fn handle(&mut self, signal: SessionSignal) -> Delivery {
        if signal.token() != self.token() {
            debug!(
                "Discarding stale {} for {} (token {}, current {})",
                signal.kind(),
                self.video_id,
                signal.token(),
                self.token()
            );
            return Delivery::Stale;
        }

        match signal {
            SessionSignal::ProbeResolved { state, .. } => {
                if self.state != SessionState::Probing {
                    return Delivery::Stale;
                }
                self.probe = None;
                self.on_probe_resolved(state);
                Delivery::Applied
            }
            SessionSignal::Tick { .. } => {
                if self.state != SessionState::Attached(PlayState::Playing) {
                    return Delivery::Stale;
                }
                self.record_position();
                Delivery::Applied
            }
            SessionSignal::PlaybackEnded { .. } => {
                if !matches!(self.state, SessionState::Attached(_)) {
                    return Delivery::Stale;
                }
                self.ticker = None;
                self.state = SessionState::Ended;
                info!("Playback of {} reached the end", self.video_id);
                self.notify_completed();
                Delivery::Applied
            }
            SessionSignal::PlaybackFailed { reason, .. } => {
                if !matches!(self.state, SessionState::Attached(_)) {
                    return Delivery::Stale;
                }
                self.ticker = None;
                self.state = SessionState::Failed;
                warn!("Playback of {} failed: {}", self.video_id, reason);
                self.notify_error(reason);
                Delivery::Applied
            }
        }
    }

    /// Tear the session down for good
    ///
    /// Consumes the session, so nothing can be attached to it afterwards.
    pub fn dispose(mut self) {
        self.deactivate();
        debug!("Session for {} disposed", self.video_id);
    }

    fn on_probe_resolved(&mut self, state: ReadinessState) {
        match state {
            ReadinessState::Ready(asset) => {
                self.readiness = ReadinessState::Ready(asset.clone());
                self.emit_probe_outcome(ProbeOutcome::Ready);
                self.attach(asset);
            }
            ReadinessState::Failed(err) => {
                let reason = err.to_string();
                self.readiness = ReadinessState::Failed(err);
                self.state = SessionState::Failed;
                warn!("Readiness probe for {} failed: {}", self.video_id, reason);
                self.emit_probe_outcome(ProbeOutcome::Failed);
                self.notify_error(reason);
            }
            other => {
                // Relay only forwards terminal states
                debug!("Ignoring non-terminal readiness {} for {}", other, self.video_id);
            }
        }
    }

    fn attach(&mut self, asset: PreparedAsset) {
        let events = PlayerEventSink::new(self.token(), self.env.signals.clone());
        self.player
            .replace_current_item(Some(PlayerItem { asset, events }));

        let resume_from = self.env.store.get(&self.video_id);
        if let Some(offset) = resume_from {
            self.player.seek(offset);
        }

        if !self.env.options.autoplay_on_ready {
            self.state = SessionState::Attached(PlayState::Paused);
            info!(
                "Attached {} paused at {}",
                self.video_id,
                vscroll_common::human_time::format_offset_opt(resume_from)
            );
            return;
        }

        self.player.play();
        self.state = SessionState::Attached(PlayState::Playing);
        self.start_ticker();

        info!(
            "Playing {} from {}",
            self.video_id,
            vscroll_common::human_time::format_offset_opt(resume_from)
        );
        self.env.events.emit_lossy(FeedEvent::PlaybackStarted {
            video_id: self.video_id.clone(),
            resumed_from: resume_from,
            timestamp: Utc::now(),
        });
    }

    fn start_ticker(&mut self) {
        self.ticker = Some(Ticker::start(
            self.env.options.tick_interval,
            self.token(),
            self.env.signals.clone(),
        ));
    }

    fn record_position(&mut self) {
        let position = self.player.current_time();
        self.env.store.set(&self.video_id, position);
        trace!("Recorded {} at {}", self.video_id, position);
        self.env.events.emit_lossy(FeedEvent::PositionRecorded {
            video_id: self.video_id.clone(),
            position,
            timestamp: Utc::now(),
        });
    }

    fn emit_probe_outcome(&self, outcome: ProbeOutcome) {
        self.env.events.emit_lossy(FeedEvent::ProbeResolved {
            video_id: self.video_id.clone(),
            outcome,
            timestamp: Utc::now(),
        });
    }

    fn notify_completed(&mut self) {
        if self.terminal_notified {
            return;
        }
        self.terminal_notified = true;
        (self.sinks.on_video_completed)();
        self.env.events.emit_lossy(FeedEvent::VideoCompleted {
            video_id: self.video_id.clone(),
            timestamp: Utc::now(),
        });
    }

    fn notify_error(&mut self, reason: String) {
        if self.terminal_notified {
            return;
        }
        self.terminal_notified = true;
        (self.sinks.on_video_error)();
        self.env.events.emit_lossy(FeedEvent::VideoFailed {
            video_id: self.video_id.clone(),
            reason,
            timestamp: Utc::now(),
        });
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.deactivate();
    }
}
