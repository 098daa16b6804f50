//! Test doubles for feed controller integration tests
//!
//! - ScriptedLoader: readiness probes resolve when the test says so
//! - FakePlayers: players that record every transport call
//! - NotifyCounter: counts completion/error notifications per item
//!
//! All helpers assume a current-thread runtime with a paused clock.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use vscroll_common::{PlaybackOffset, VideoId};
use vscroll_feed::error::ProbeError;
use vscroll_feed::feed::SinkFactory;
use vscroll_feed::media::{AssetLoader, MediaPlayer, PlayerFactory, PlayerItem, PreparedAsset};
use vscroll_feed::playback::PlayerEventSink;
use vscroll_feed::{FeedController, PositionStore, SessionOptions, SessionSinks};

type Gate = oneshot::Sender<Result<PreparedAsset, ProbeError>>;

/// Loader whose probes stay pending until resolved by the test
#[derive(Default)]
pub struct ScriptedLoader {
    gates: Mutex<HashMap<VideoId, VecDeque<Gate>>>,
    requests: Mutex<Vec<VideoId>>,
}

impl ScriptedLoader {
    /// Resolve the oldest pending probe for `id`
    ///
    /// Returns false if no probe is pending or it was already canceled.
    pub fn resolve(&self, id: &str, result: Result<PreparedAsset, ProbeError>) -> bool {
        let gate = self
            .gates
            .lock()
            .get_mut(&VideoId::new(id))
            .and_then(|gates| gates.pop_front());
        match gate {
            Some(gate) => gate.send(result).is_ok(),
            None => false,
        }
    }

    pub fn resolve_ready(&self, id: &str) -> bool {
        self.resolve(id, Ok(PreparedAsset::new(VideoId::new(id))))
    }

    pub fn resolve_failed(&self, id: &str, reason: &str) -> bool {
        self.resolve(
            id,
            Err(ProbeError::Unplayable {
                reason: reason.to_string(),
            }),
        )
    }

    /// Number of probes started for `id`
    pub fn request_count(&self, id: &str) -> usize {
        let id = VideoId::new(id);
        self.requests.lock().iter().filter(|r| **r == id).count()
    }
}

impl AssetLoader for ScriptedLoader {
    fn load_playable(
        &self,
        video_id: &VideoId,
    ) -> BoxFuture<'static, Result<PreparedAsset, ProbeError>> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .entry(video_id.clone())
            .or_default()
            .push_back(tx);
        self.requests.lock().push(video_id.clone());
        async move { rx.await.unwrap_or(Err(ProbeError::Canceled)) }.boxed()
    }
}

/// Transport call observed by a fake player
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Attach,
    Detach,
    Play,
    Pause,
    Seek(f64),
    CancelLoading,
}

#[derive(Default)]
struct PlayerLog {
    calls: Vec<Call>,
    position: f64,
    sink: Option<PlayerEventSink>,
}

/// Test-side view of one fake player
#[derive(Clone, Default)]
pub struct PlayerProbe {
    log: Arc<Mutex<PlayerLog>>,
}

impl PlayerProbe {
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.log.lock().calls.clear();
    }

    /// Move the playback clock without recording a call
    pub fn set_position(&self, secs: f64) {
        self.log.lock().position = secs;
    }

    /// Event sink of the currently attached item
    pub fn sink(&self) -> Option<PlayerEventSink> {
        self.log.lock().sink.clone()
    }

    /// Calls made after the most recent attach, attach included
    pub fn calls_since_attach(&self) -> Vec<Call> {
        let calls = self.calls();
        match calls.iter().rposition(|c| *c == Call::Attach) {
            Some(start) => calls[start..].to_vec(),
            None => Vec::new(),
        }
    }
}

struct FakePlayer {
    probe: PlayerProbe,
}

impl MediaPlayer for FakePlayer {
    fn replace_current_item(&mut self, item: Option<PlayerItem>) {
        let mut log = self.probe.log.lock();
        match item {
            Some(item) => {
                log.calls.push(Call::Attach);
                log.sink = Some(item.events);
            }
            None => {
                log.calls.push(Call::Detach);
                log.sink = None;
            }
        }
    }

    fn rebind_events(&mut self, events: PlayerEventSink) {
        let mut log = self.probe.log.lock();
        if log.sink.is_some() {
            log.sink = Some(events);
        }
    }

    fn play(&mut self) {
        self.probe.log.lock().calls.push(Call::Play);
    }

    fn pause(&mut self) {
        self.probe.log.lock().calls.push(Call::Pause);
    }

    fn seek(&mut self, offset: PlaybackOffset) {
        let mut log = self.probe.log.lock();
        log.calls.push(Call::Seek(offset.as_secs()));
        log.position = offset.as_secs();
    }

    fn current_time(&self) -> PlaybackOffset {
        PlaybackOffset::from_secs(self.probe.log.lock().position)
    }

    fn cancel_loading(&mut self) {
        self.probe.log.lock().calls.push(Call::CancelLoading);
    }
}

/// Player factory that keeps a probe for every player it creates
#[derive(Clone, Default)]
pub struct FakePlayers {
    created: Arc<Mutex<Vec<(VideoId, PlayerProbe)>>>,
}

impl FakePlayers {
    /// Most recently created player for `id`
    pub fn latest(&self, id: &str) -> PlayerProbe {
        let id = VideoId::new(id);
        self.created
            .lock()
            .iter()
            .rev()
            .find(|(v, _)| *v == id)
            .map(|(_, probe)| probe.clone())
            .expect("no player created for id")
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

impl PlayerFactory for FakePlayers {
    fn create(&self, video_id: &VideoId) -> Box<dyn MediaPlayer> {
        let probe = PlayerProbe::default();
        self.created.lock().push((video_id.clone(), probe.clone()));
        Box::new(FakePlayer { probe })
    }
}

/// Completion and error counts per feed index
#[derive(Clone, Default)]
pub struct NotifyCounter {
    counts: Arc<Mutex<HashMap<usize, (usize, usize)>>>,
}

impl NotifyCounter {
    pub fn completed(&self, index: usize) -> usize {
        self.counts.lock().get(&index).map_or(0, |c| c.0)
    }

    pub fn errors(&self, index: usize) -> usize {
        self.counts.lock().get(&index).map_or(0, |c| c.1)
    }

    pub fn sink_factory(&self) -> SinkFactory {
        let counts = Arc::clone(&self.counts);
        Box::new(move |index: usize, _video_id: &VideoId| {
            let on_completed = Arc::clone(&counts);
            let on_error = Arc::clone(&counts);
            SessionSinks::new(
                move || on_completed.lock().entry(index).or_default().0 += 1,
                move || on_error.lock().entry(index).or_default().1 += 1,
            )
        })
    }
}

/// Everything a controller test needs
pub struct Harness {
    pub controller: FeedController,
    pub loader: Arc<ScriptedLoader>,
    pub players: FakePlayers,
    pub notify: NotifyCounter,
    pub store: Arc<PositionStore>,
}

/// Options used unless a test overrides them
pub fn test_options() -> SessionOptions {
    SessionOptions {
        tick_interval: Duration::from_secs(1),
        autoplay_on_ready: true,
        tap_to_replay: true,
        probe_timeout: Duration::from_secs(3600),
    }
}

pub fn harness(ids: &[&str]) -> Harness {
    harness_with(ids, test_options())
}

pub fn harness_with(ids: &[&str], options: SessionOptions) -> Harness {
    let loader = Arc::new(ScriptedLoader::default());
    let players = FakePlayers::default();
    let notify = NotifyCounter::default();
    let store = Arc::new(PositionStore::new());
    let items = ids.iter().map(|id| VideoId::new(*id)).collect();

    let controller = FeedController::new(
        items,
        Arc::clone(&store),
        loader.clone(),
        Arc::new(players.clone()),
        options,
    )
    .with_sinks(notify.sink_factory());

    Harness {
        controller,
        loader,
        players,
        notify,
        store,
    }
}

/// Let every spawned task run until the runtime is idle
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

impl Harness {
    /// Run background tasks, then apply whatever they delivered
    pub async fn pump(&mut self) -> usize {
        settle().await;
        self.controller.process_pending()
    }

    /// Advance the paused clock by `secs` seconds, applying signals as they arrive
    pub async fn advance_secs(&mut self, secs: u64) {
        for _ in 0..secs {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.pump().await;
        }
    }

    /// Activate `index` and resolve its probe Ready
    pub async fn activate_ready(&mut self, index: usize, id: &str) {
        assert!(self.controller.activate(index).unwrap());
        settle().await;
        assert!(self.loader.resolve_ready(id));
        self.pump().await;
    }

    pub fn stored(&self, id: &str) -> Option<f64> {
        self.store.get(&VideoId::new(id)).map(|o| o.as_secs())
    }
}
