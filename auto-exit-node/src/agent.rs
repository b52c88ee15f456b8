// Evaluation loop

//! Agent
//!
//! Owns everything that lives across ticks: the configuration, the probe, the
//! controller, the evaluator memory and the status publisher. Ticks run one at
//! a time on the caller's task, so the memory and the controller are never
//! touched concurrently.

use crate::controller::ExitNodeControl;
use crate::evaluator::{evaluate, EvaluatorMemory};
use crate::probe::ConnectivityProbe;
use crate::scheduler::{Scheduler, Trigger};
use crate::status::StatusPublisher;
use crate::types::{Config, ConnectivityState, StatusReport};
use std::future::Future;
use std::time::Duration;

/// Upper bound for one connectivity snapshot
const PROBE_TIMEOUT: Duration = Duration::from_secs(8);

/// Exit-node agent
pub struct Agent<C> {
    config: Config,
    probe: ConnectivityProbe,
    controller: C,
    memory: EvaluatorMemory,
    status: StatusPublisher,
    tailscale_available: bool,
}

impl<C: ExitNodeControl> Agent<C> {
    /// Create an agent.
    ///
    /// `tailscale_available` is decided once by the caller; when false every
    /// tick is skipped and the "not found" status is published instead.
    pub fn new(
        config: Config,
        probe: ConnectivityProbe,
        controller: C,
        status: StatusPublisher,
        tailscale_available: bool,
    ) -> Self {
        if !tailscale_available {
            status.publish(StatusReport::unavailable());
        }

        Self {
            config,
            probe,
            controller,
            memory: EvaluatorMemory::new(),
            status,
            tailscale_available,
        }
    }

    /// Run a single evaluation and publish its status
    pub async fn tick(&mut self, trigger: Trigger) -> StatusReport {
        if !self.tailscale_available {
            log::debug!("Tailscale unavailable, ignoring {:?}", trigger);
            return self.status.current();
        }

        let state = match tokio::time::timeout(PROBE_TIMEOUT, self.probe.probe()).await {
            Ok(state) => state,
            Err(_) => {
                log::warn!("Connectivity probe timed out, treating as no data");
                ConnectivityState::default()
            }
        };
        log::debug!("{:?} tick: {:?}", trigger, state);

        let result = evaluate(&state, &self.config, &mut self.memory, &self.controller).await;

        let report = StatusReport::from_result(&result);
        self.status.publish(report.clone());
        report
    }

    /// Evaluate on every scheduler request until `shutdown` resolves.
    ///
    /// A tick in progress is abandoned when `shutdown` fires.
    pub async fn run<F>(&mut self, scheduler: &mut Scheduler, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let trigger = tokio::select! {
                _ = &mut shutdown => break,
                trigger = scheduler.next() => trigger,
            };

            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, abandoning {:?} tick", trigger);
                    break;
                }
                _ = self.tick(trigger) => {}
            }
        }
    }

    /// Evaluator memory (read-only view)
    pub fn memory(&self) -> &EvaluatorMemory {
        &self.memory
    }

    /// Status publisher
    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }
}
