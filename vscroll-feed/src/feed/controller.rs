//! Feed controller
//!
//! Owns the ordered feed and a registry of playback sessions keyed by item
//! index. The external list host decides visibility; the controller only
//! reacts to it:
//!
//! - view constructed → session created (`view_appeared`)
//! - item visible / hidden → `activate` / `deactivate`
//! - view torn down → deactivate + dispose (`view_disappeared`)
//!
//! Every session transition and every asynchronous result runs on the
//! controller, so a single session is never mutated concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vscroll_common::events::EventBus;
use vscroll_common::VideoId;

use super::handle::{FeedCommand, FeedHandle};
use crate::error::{Error, Result};
use crate::media::{AssetLoader, PlayerFactory};
use crate::playback::session::{
    Delivery, PlaybackSession, SessionEnv, SessionOptions, SessionSinks, SessionState,
};
use crate::playback::signal::{GenerationSource, SessionSignal, SignalReceiver};
use crate::playback::{PositionStore, ReadinessProbe};

/// Builds the completion/error sinks for each new session
pub type SinkFactory = Box<dyn Fn(usize, &VideoId) -> SessionSinks + Send>;

/// Host operations addressed to one feed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOp {
    ViewAppeared,
    ViewDisappeared,
    Activate,
    Deactivate,
    Replay,
    Pause,
    Resume,
}

impl std::fmt::Display for FeedOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedOp::ViewAppeared => write!(f, "view_appeared"),
            FeedOp::ViewDisappeared => write!(f, "view_disappeared"),
            FeedOp::Activate => write!(f, "activate"),
            FeedOp::Deactivate => write!(f, "deactivate"),
            FeedOp::Replay => write!(f, "replay"),
            FeedOp::Pause => write!(f, "pause"),
            FeedOp::Resume => write!(f, "resume"),
        }
    }
}

/// Ordered feed plus its live sessions
pub struct FeedController {
    items: Vec<VideoId>,
    sessions: BTreeMap<usize, PlaybackSession>,
    env: SessionEnv,
    players: Arc<dyn PlayerFactory>,
    sinks: Option<SinkFactory>,
    signal_rx: SignalReceiver,
}

impl FeedController {
    /// Create a controller over `items`
    ///
    /// `store` is shared with (and outlives) every session the controller
    /// creates.
    pub fn new(
        items: Vec<VideoId>,
        store: Arc<PositionStore>,
        loader: Arc<dyn AssetLoader>,
        players: Arc<dyn PlayerFactory>,
        options: SessionOptions,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let env = SessionEnv {
            store,
            probe: ReadinessProbe::new(loader, options.probe_timeout),
            signals: signal_tx,
            events: EventBus::default(),
            generations: GenerationSource::new(),
            options,
        };
        Self {
            items,
            sessions: BTreeMap::new(),
            env,
            players,
            sinks: None,
            signal_rx,
        }
    }

    /// Publish feed events on `events` instead of a private bus
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.env.events = events;
        self
    }

    /// Supply per-session completion/error sinks
    pub fn with_sinks(mut self, sinks: SinkFactory) -> Self {
        self.sinks = Some(sinks);
        self
    }

    pub fn items(&self) -> &[VideoId] {
        &self.items
    }

    pub fn store(&self) -> &Arc<PositionStore> {
        &self.env.store
    }

    pub fn events(&self) -> &EventBus {
        &self.env.events
    }

    pub fn options(&self) -> &SessionOptions {
        &self.env.options
    }

    /// Number of constructed sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// State of the session at `index`, if one is constructed
    pub fn session_state(&self, index: usize) -> Option<SessionState> {
        self.sessions.get(&index).map(|s| s.state())
    }

    pub fn session(&self, index: usize) -> Option<&PlaybackSession> {
        self.sessions.get(&index)
    }

    /// Item view was constructed: create its session
    pub fn view_appeared(&mut self, index: usize) -> Result<bool> {
        let created = !self.sessions.contains_key(&index);
        self.ensure_session(index)?;
        if created {
            debug!("Created session for item {}", index);
        }
        Ok(created)
    }

    /// Item view was torn down: deactivate and dispose its session
    pub fn view_disappeared(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        match self.sessions.remove(&index) {
            Some(session) => {
                session.dispose();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Item became visible
    ///
    /// Creates the session first if the host never reported the view.
    pub fn activate(&mut self, index: usize) -> Result<bool> {
        Ok(self.ensure_session(index)?.activate())
    }

    /// Item left the visibility window
    pub fn deactivate(&mut self, index: usize) -> Result<bool> {
        Ok(self.existing(index)?.map_or(false, |s| s.deactivate()))
    }

    /// Explicit replay request (tap gesture)
    pub fn replay(&mut self, index: usize) -> Result<bool> {
        Ok(self.existing(index)?.map_or(false, |s| s.replay()))
    }

    pub fn pause(&mut self, index: usize) -> Result<bool> {
        Ok(self.existing(index)?.map_or(false, |s| s.pause()))
    }

    pub fn resume(&mut self, index: usize) -> Result<bool> {
        Ok(self.existing(index)?.map_or(false, |s| s.resume()))
    }

    /// Apply a host operation
    pub fn apply(&mut self, op: FeedOp, index: usize) -> Result<bool> {
        match op {
            FeedOp::ViewAppeared => self.view_appeared(index),
            FeedOp::ViewDisappeared => self.view_disappeared(index),
            FeedOp::Activate => self.activate(index),
            FeedOp::Deactivate => self.deactivate(index),
            FeedOp::Replay => self.replay(index),
            FeedOp::Pause => self.pause(index),
            FeedOp::Resume => self.resume(index),
        }
    }

    /// Route an asynchronous result to its session
    pub fn dispatch(&mut self, signal: SessionSignal) -> Delivery {
        let token = signal.token();
        match self.sessions.get_mut(&token.slot) {
            Some(session) => session.handle(signal),
            None => {
                debug!(
                    "Discarding {} for disposed session {}",
                    signal.kind(),
                    token
                );
                Delivery::Stale
            }
        }
    }

    /// Wait for the next asynchronous result and apply it
    pub async fn process_next(&mut self) -> Option<Delivery> {
        let signal = self.signal_rx.recv().await?;
        Some(self.dispatch(signal))
    }

    /// Apply every result already queued, without waiting
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(signal) = self.signal_rx.try_recv() {
            if self.dispatch(signal) == Delivery::Applied {
                applied += 1;
            }
        }
        applied
    }

    /// Dispose every session
    pub fn shutdown(&mut self) {
        let sessions = std::mem::take(&mut self.sessions);
        let count = sessions.len();
        for (_, session) in sessions {
            session.dispose();
        }
        info!("Feed controller shut down ({} sessions disposed)", count);
    }

    /// Run the controller as a task driven through a [`FeedHandle`]
    pub fn spawn(self, command_capacity: usize) -> (FeedHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(command_capacity);
        let task = tokio::spawn(self.run(rx));
        (FeedHandle::new(tx), task)
    }

    /// Control loop: host commands and session signals, one at a time
    ///
    /// Returns when every handle has been dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<FeedCommand>) {
        info!("Feed controller started with {} items", self.items.len());
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(signal) = self.signal_rx.recv() => {
                    self.dispatch(signal);
                }
            }
        }
        self.shutdown();
    }

    fn handle_command(&mut self, command: FeedCommand) {
        match command {
            FeedCommand::Apply { op, index, reply } => {
                let result = self.apply(op, index);
                if let Err(e) = &result {
                    warn!("Feed operation {} on item {} failed: {}", op, index, e);
                }
                let _ = reply.send(result);
            }
            FeedCommand::State { index, reply } => {
                let _ = reply.send(self.session_state(index));
            }
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(Error::UnknownItem(index))
        }
    }

    fn existing(&mut self, index: usize) -> Result<Option<&mut PlaybackSession>> {
        self.check_index(index)?;
        Ok(self.sessions.get_mut(&index))
    }

    fn ensure_session(&mut self, index: usize) -> Result<&mut PlaybackSession> {
        let video_id = self
            .items
            .get(index)
            .cloned()
            .ok_or(Error::UnknownItem(index))?;

        let players = &self.players;
        let sinks = &self.sinks;
        let env = &self.env;
        Ok(self.sessions.entry(index).or_insert_with(|| {
            let player = players.create(&video_id);
            let sinks = sinks
                .as_ref()
                .map(|factory| factory(index, &video_id))
                .unwrap_or_default();
            PlaybackSession::new(index, video_id, player, sinks, env.clone())
        }))
    }
}

