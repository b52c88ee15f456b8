// Evaluation scheduling

//! Evaluation scheduling
//!
//! Produces one stream of evaluation requests from a fixed-period timer and
//! on-demand triggers. On-demand triggers go through a queue of depth one: a
//! trigger that arrives while another is already pending is dropped, since the
//! pending evaluation will observe the same network state.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Why an evaluation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fixed-period timer
    Periodic,
    /// Operator asked for an immediate sync
    ForceSync,
    /// The OS reported a network change
    NetworkChanged,
}

/// Cloneable handle for requesting an evaluation
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<Trigger>,
}

impl TriggerHandle {
    /// Request an evaluation. Returns false if it was coalesced into one
    /// already pending, or the scheduler is gone.
    pub fn request(&self, trigger: Trigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::debug!("{:?} coalesced with pending trigger", trigger);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Single stream of evaluation requests
pub struct Scheduler {
    timer: Interval,
    rx: mpsc::Receiver<Trigger>,
    tx: mpsc::Sender<Trigger>,
}

impl Scheduler {
    /// Create a scheduler ticking every `period`; the first tick fires immediately.
    pub fn new(period: Duration) -> Self {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let (tx, rx) = mpsc::channel(1);
        Self { timer, rx, tx }
    }

    /// Handle for on-demand triggers
    pub fn handle(&self) -> TriggerHandle {
        TriggerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Wait for the next evaluation request. Cancel-safe.
    pub async fn next(&mut self) -> Trigger {
        tokio::select! {
            biased;
            Some(trigger) = self.rx.recv() => trigger,
            _ = self.timer.tick() => Trigger::Periodic,
        }
    }
}
