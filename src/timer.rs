//! Rest countdown and the 1 Hz tick source that drives it

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// One-shot signal emitted when a countdown reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestComplete {
    /// Sequence number of the `start` call that produced this countdown
    pub countdown: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestState {
    Idle,
    Counting { remaining: u32 },
}

/// Single rest countdown. A new `start` replaces the running one.
#[derive(Debug, Default)]
pub struct RestTimer {
    remaining: Option<u32>,
    started: u64,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a countdown of `duration_secs`.
    ///
    /// Zero or negative durations complete at once and the signal is returned
    /// directly instead of waiting for a tick.
    pub fn start(&mut self, duration_secs: i64) -> Option<RestComplete> {
        self.started += 1;
        if duration_secs <= 0 {
            self.remaining = None;
            debug!(countdown = self.started, "rest skipped");
            return Some(RestComplete { countdown: self.started });
        }
        let secs = u32::try_from(duration_secs).unwrap_or(u32::MAX);
        self.remaining = Some(secs);
        debug!(countdown = self.started, secs, "rest started");
        None
    }

    /// Advance by one second
    pub fn tick(&mut self) -> Option<RestComplete> {
        let remaining = self.remaining?;
        if remaining > 1 {
            self.remaining = Some(remaining - 1);
            return None;
        }
        self.remaining = None;
        debug!(countdown = self.started, "rest complete");
        Some(RestComplete { countdown: self.started })
    }

    /// Drop the running countdown without a signal
    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn state(&self) -> RestState {
        match self.remaining {
            Some(remaining) => RestState::Counting { remaining },
            None => RestState::Idle,
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn is_idle(&self) -> bool {
        self.remaining.is_none()
    }
}

/// Shared cancellation flag for background tick sources
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Periodic tick source running as a tokio task.
///
/// Ticks stop once the token is cancelled or the ticker is dropped.
pub struct Ticker {
    rx: mpsc::UnboundedReceiver<()>,
    token: CancelToken,
}

impl Ticker {
    /// 1 Hz ticker for the session clock and rest countdown
    pub fn every_second(token: CancelToken) -> Self {
        Self::spawn(Duration::from_secs(1), token)
    }

    /// Must be called from within a tokio runtime
    pub fn spawn(period: Duration, token: CancelToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task_token = token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick of a tokio interval fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if task_token.is_cancelled() || tx.send(()).is_err() {
                    break;
                }
            }
            debug!("ticker stopped");
        });

        Self { rx, token }
    }

    /// Number of ticks that arrived since the last call, without blocking
    pub fn drain(&mut self) -> u32 {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    /// Wait for the next tick; `None` after cancellation
    pub async fn next(&mut self) -> Option<()> {
        if self.token.is_cancelled() {
            return None;
        }
        self.rx.recv().await
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
