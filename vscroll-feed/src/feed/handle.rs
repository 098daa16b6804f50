//! Cloneable handle to a running feed controller task

use tokio::sync::{mpsc, oneshot};

use super::controller::FeedOp;
use crate::error::{Error, Result};
use crate::playback::session::SessionState;

/// Requests processed by the controller's run loop
#[derive(Debug)]
pub(crate) enum FeedCommand {
    Apply {
        op: FeedOp,
        index: usize,
        reply: oneshot::Sender<Result<bool>>,
    },
    State {
        index: usize,
        reply: oneshot::Sender<Option<SessionState>>,
    },
}

/// Host-side entry point for a spawned [`FeedController`]
///
/// The controller stops once every handle is dropped.
///
/// [`FeedController`]: super::FeedController
#[derive(Clone, Debug)]
pub struct FeedHandle {
    tx: mpsc::Sender<FeedCommand>,
}

impl FeedHandle {
    pub(crate) fn new(tx: mpsc::Sender<FeedCommand>) -> Self {
        Self { tx }
    }

    /// Apply `op` to item `index` and wait for the controller's answer
    pub async fn apply(&self, op: FeedOp, index: usize) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(FeedCommand::Apply { op, index, reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    pub async fn view_appeared(&self, index: usize) -> Result<bool> {
        self.apply(FeedOp::ViewAppeared, index).await
    }

    pub async fn view_disappeared(&self, index: usize) -> Result<bool> {
        self.apply(FeedOp::ViewDisappeared, index).await
    }

    pub async fn activate(&self, index: usize) -> Result<bool> {
        self.apply(FeedOp::Activate, index).await
    }

    pub async fn deactivate(&self, index: usize) -> Result<bool> {
        self.apply(FeedOp::Deactivate, index).await
    }

    pub async fn replay(&self, index: usize) -> Result<bool> {
        self.apply(FeedOp::Replay, index).await
    }

    pub async fn pause(&self, index: usize) -> Result<bool> {
        self.apply(FeedOp::Pause, index).await
    }

    pub async fn resume(&self, index: usize) -> Result<bool> {
        self.apply(FeedOp::Resume, index).await
    }

    /// Current session state of item `index`, None if no session exists
    pub async fn state(&self, index: usize) -> Result<Option<SessionState>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(FeedCommand::State { index, reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// True once the controller task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
