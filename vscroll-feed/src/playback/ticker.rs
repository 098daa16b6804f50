//! Periodic position tick source
//!
//! While a session is playing, a timer task posts a [`SessionSignal::Tick`]
//! onto the control loop once per interval. The first tick fires one full
//! interval after start. Dropping the ticker stops the task.
//!
//! Periods shorter than [`MIN_TICK_INTERVAL`] are raised to it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::signal::{SessionSignal, SessionToken, SignalSender};

/// Shortest accepted tick period
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running tick timer
#[derive(Debug)]
pub struct Ticker {
    task: JoinHandle<()>,
}

impl Ticker {
    /// Start ticking for `token` every `period`
    pub fn start(period: Duration, token: SessionToken, tx: SignalSender) -> Self {
        let period = period.max(MIN_TICK_INTERVAL);
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(SessionSignal::Tick { token }).is_err() {
                    // Control loop is gone
                    break;
                }
            }
        });
        Self { task }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
