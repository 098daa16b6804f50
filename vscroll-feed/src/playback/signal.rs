//! Session tokens and the signals delivered back onto the control loop
//!
//! Every piece of asynchronous work a session starts (readiness probe, tick
//! timer, player observation) reports through a [`SessionSignal`] stamped
//! with the [`SessionToken`] that was current when the work began. A session
//! bumps its generation on deactivation, so anything stamped earlier can no
//! longer match and is dropped on arrival.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::probe::ReadinessState;

/// Identity of one activation of one feed slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken {
    /// Feed item index the session is bound to
    pub slot: usize,
    /// Activation generation, unique across the controller
    pub generation: u64,
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.slot, self.generation)
    }
}

/// Controller-wide generation counter
///
/// Shared by all sessions of one controller, so a session recreated on the
/// same slot never reuses a generation of its predecessor.
#[derive(Debug, Clone, Default)]
pub struct GenerationSource {
    next: Arc<AtomicU64>,
}

impl GenerationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh generation (never 0)
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Asynchronous results addressed to a session
#[derive(Debug)]
pub enum SessionSignal {
    /// Readiness probe reached a terminal state
    ProbeResolved {
        token: SessionToken,
        state: ReadinessState,
    },

    /// Periodic position tick
    Tick { token: SessionToken },

    /// Player reached the natural end of the attached item
    PlaybackEnded { token: SessionToken },

    /// Player reported the attached item failed
    PlaybackFailed { token: SessionToken, reason: String },
}

impl SessionSignal {
    pub fn token(&self) -> SessionToken {
        match self {
            SessionSignal::ProbeResolved { token, .. }
            | SessionSignal::Tick { token }
            | SessionSignal::PlaybackEnded { token }
            | SessionSignal::PlaybackFailed { token, .. } => *token,
        }
    }

    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            SessionSignal::ProbeResolved { .. } => "probe_resolved",
            SessionSignal::Tick { .. } => "tick",
            SessionSignal::PlaybackEnded { .. } => "playback_ended",
            SessionSignal::PlaybackFailed { .. } => "playback_failed",
        }
    }
}

/// Sending half of the control loop's signal queue
pub type SignalSender = mpsc::UnboundedSender<SessionSignal>;

/// Receiving half of the control loop's signal queue
pub type SignalReceiver = mpsc::UnboundedReceiver<SessionSignal>;

/// Player-side reporting handle for one attached item
#[derive(Debug, Clone)]
pub struct PlayerEventSink {
    token: SessionToken,
    tx: SignalSender,
}

impl PlayerEventSink {
    pub fn new(token: SessionToken, tx: SignalSender) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Report that playback reached the end of the item
    pub fn completed(&self) {
        // Closed queue means the controller is gone; nothing left to notify
        let _ = self.tx.send(SessionSignal::PlaybackEnded { token: self.token });
    }

    /// Report that the item failed to play
    pub fn failed(&self, reason: impl Into<String>) {
        let _ = self.tx.send(SessionSignal::PlaybackFailed {
            token: self.token,
            reason: reason.into(),
        });
    }
}
