//! Asynchronous readiness probing
//!
//! A probe asks the [`AssetLoader`] whether a resource can start playback,
//! off the control loop so that instantiating many feed items at once never
//! stalls scrolling. Its progress is observable as a short sequence of
//! [`ReadinessState`] transitions ending in exactly one terminal state.
//!
//! Cancellation is best-effort: a cancel racing a successful load may lose
//! inside the probe, so callers that must never act on a canceled probe
//! (sessions) also discard late results by token.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use vscroll_common::VideoId;

use crate::error::ProbeError;
use crate::media::{AssetLoader, PreparedAsset};

/// Readiness of one resource
///
/// `Unknown → Probing → Ready | Failed`; Ready and Failed are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadinessState {
    Unknown,
    Probing,
    Ready(PreparedAsset),
    Failed(ProbeError),
}

impl ReadinessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadinessState::Ready(_) | ReadinessState::Failed(_))
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessState::Unknown => write!(f, "unknown"),
            ReadinessState::Probing => write!(f, "probing"),
            ReadinessState::Ready(_) => write!(f, "ready"),
            ReadinessState::Failed(e) => write!(f, "failed ({})", e),
        }
    }
}

/// Starts readiness probes against one loader
#[derive(Clone)]
pub struct ReadinessProbe {
    loader: Arc<dyn AssetLoader>,
    timeout: Duration,
}

impl ReadinessProbe {
    pub fn new(loader: Arc<dyn AssetLoader>, timeout: Duration) -> Self {
        Self { loader, timeout }
    }

    /// Begin probing `video_id`
    ///
    /// The returned handle starts in `Probing`. Must be called from within a
    /// tokio runtime. Dropping the handle cancels the probe.
    pub fn probe(&self, video_id: &VideoId) -> ProbeHandle {
        let (tx, rx) = watch::channel(ReadinessState::Probing);
        let tx = Arc::new(tx);

        let load = self.loader.load_playable(video_id);
        let timeout = self.timeout;
        let task_tx = Arc::clone(&tx);
        let task_id = video_id.clone();

        let task = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, load).await {
                Ok(Ok(asset)) => ReadinessState::Ready(asset),
                Ok(Err(e)) => ReadinessState::Failed(e),
                Err(_) => ReadinessState::Failed(ProbeError::TimedOut),
            };
            debug!("Probe for {} finished: {}", task_id, outcome);
            settle(&task_tx, outcome);
        });

        ProbeHandle {
            video_id: video_id.clone(),
            tx,
            rx,
            task,
        }
    }
}

/// Write a terminal state unless one is already present
fn settle(tx: &watch::Sender<ReadinessState>, outcome: ReadinessState) -> bool {
    tx.send_if_modified(move |current| {
        if current.is_terminal() {
            false
        } else {
            *current = outcome;
            true
        }
    })
}

/// Wait until `rx` observes a terminal state
///
/// A probe whose sender vanished without resolving counts as canceled.
pub async fn wait_terminal(rx: &mut watch::Receiver<ReadinessState>) -> ReadinessState {
    match rx.wait_for(|state| state.is_terminal()).await {
        Ok(state) => state.clone(),
        Err(_) => ReadinessState::Failed(ProbeError::Canceled),
    }
}

/// One in-flight (or finished) probe
pub struct ProbeHandle {
    video_id: VideoId,
    tx: Arc<watch::Sender<ReadinessState>>,
    rx: watch::Receiver<ReadinessState>,
    task: JoinHandle<()>,
}

impl ProbeHandle {
    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    /// Latest state
    pub fn state(&self) -> ReadinessState {
        self.rx.borrow().clone()
    }

    /// Raw watch receiver over the state
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.rx.clone()
    }

    /// Lazy sequence of transitions: the current state, then each change,
    /// ending after the terminal state
    pub fn transitions(&self) -> impl Stream<Item = ReadinessState> + Send + 'static {
        futures::stream::unfold(
            (self.rx.clone(), true, false),
            |(mut rx, first, done)| async move {
                if done {
                    return None;
                }
                if !first && rx.changed().await.is_err() {
                    return None;
                }
                let state = rx.borrow_and_update().clone();
                let done = state.is_terminal();
                Some((state, (rx, false, done)))
            },
        )
    }

    /// Wait for the terminal state
    pub async fn resolved(&self) -> ReadinessState {
        let mut rx = self.rx.clone();
        wait_terminal(&mut rx).await
    }

    /// Cancel the probe
    ///
    /// Returns true if the probe had not resolved yet, in which case its
    /// terminal state becomes `Failed(Canceled)`.
    pub fn cancel(&self) -> bool {
        let canceled = settle(&self.tx, ReadinessState::Failed(ProbeError::Canceled));
        self.task.abort();
        if canceled {
            debug!("Probe for {} canceled", self.video_id);
        }
        canceled
    }
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
