// Exit-node decision and debounce

//! State evaluation
//!
//! Turns a connectivity snapshot into a desired exit-node state, then decides
//! against the previous tick whether the controller needs to be invoked.
//!
//! Decision table, first match wins:
//!
//! 1. cellular link up: activate ("Cellular")
//! 2. no SSID: activate ("Untrusted SSID")
//! 3. no internet: activate ("No Internet"), always re-asserted
//! 4. trusted SSID: deactivate ("Trusted SSID: <ssid>")
//! 5. otherwise: activate ("Untrusted SSID")

use crate::controller::ExitNodeControl;
use crate::error::ExitNodeError;
use crate::trust::is_trusted;
use crate::types::{
    Config, ConnectivityState, DecisionReason, EvaluationResult, ExitNodeCommand, IconKind,
};

/// Controller call required by a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Invoke `activate()`
    Activate,
    /// Invoke `deactivate()`
    Deactivate,
    /// No action needed
    None,
}

/// Cross-tick memory used to suppress redundant controller calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatorMemory {
    last_ssid: Option<String>,
    last_cellular: bool,
    last_command: Option<ExitNodeCommand>,
    last_rejection: Option<String>,
}

impl EvaluatorMemory {
    /// Fresh memory: nothing observed, no command issued
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide which controller call this tick needs.
    ///
    /// Records the observed SSID and cellular state unless the tick is a no-op.
    /// `last_command` is only changed through [`EvaluatorMemory::record`].
    pub fn plan(&mut self, state: &ConnectivityState, result: &EvaluationResult) -> ControlAction {
        let unchanged = state.ssid == self.last_ssid
            && state.cellular_connected == self.last_cellular
            && self.last_command == Some(result.command)
            && state.internet_reachable;

        if unchanged {
            log::debug!("Network state unchanged ({}), skipping", result.status_label);
            return ControlAction::None;
        }

        self.last_ssid = state.ssid.clone();
        self.last_cellular = state.cellular_connected;

        let forced = result.reason == DecisionReason::NoInternet;
        if !forced && self.last_command == Some(result.command) {
            return ControlAction::None;
        }

        match result.command {
            ExitNodeCommand::Activated => ControlAction::Activate,
            ExitNodeCommand::Deactivated => ControlAction::Deactivate,
        }
    }

    /// Remember a command the controller carried out
    pub fn record(&mut self, command: ExitNodeCommand) {
        self.last_command = Some(command);
        self.last_rejection = None;
    }

    /// Remember a configuration rejection; true if it differs from the last one
    pub fn note_rejection(&mut self, message: &str) -> bool {
        if self.last_rejection.as_deref() == Some(message) {
            return false;
        }
        self.last_rejection = Some(message.to_string());
        true
    }

    /// Last configuration rejection, cleared once a command succeeds
    pub fn last_rejection(&self) -> Option<&str> {
        self.last_rejection.as_deref()
    }

    /// Last command the controller carried out
    pub fn last_command(&self) -> Option<ExitNodeCommand> {
        self.last_command
    }

    /// SSID seen on the last non-skipped tick
    pub fn last_ssid(&self) -> Option<&str> {
        self.last_ssid.as_deref()
    }

    /// Cellular state seen on the last non-skipped tick
    pub fn last_cellular(&self) -> bool {
        self.last_cellular
    }
}

/// Apply the decision table. Pure: no I/O, no memory.
pub fn decide(state: &ConnectivityState, config: &Config) -> EvaluationResult {
    let node = config.exit_node_name();

    let active = |reason, label: &str, tooltip: String| EvaluationResult {
        status_label: label.to_string(),
        tooltip,
        icon: IconKind::Active,
        command: ExitNodeCommand::Activated,
        reason,
    };

    if state.cellular_connected {
        return active(
            DecisionReason::Cellular,
            "Cellular",
            format!("Active: {} via cellular", node),
        );
    }

    let Some(ssid) = state.ssid.as_deref() else {
        return active(
            DecisionReason::UnknownNetwork,
            "Untrusted SSID",
            format!("Active: {} (unknown network)", node),
        );
    };

    if !state.internet_reachable {
        return active(
            DecisionReason::NoInternet,
            "No Internet",
            format!("Active: {} (unknown network)", node),
        );
    }

    if is_trusted(ssid, &config.trusted_ssids) {
        return EvaluationResult {
            status_label: format!("Trusted SSID: {}", ssid),
            tooltip: format!("Inactive: trusted network ({})", ssid),
            icon: IconKind::Inactive,
            command: ExitNodeCommand::Deactivated,
            reason: DecisionReason::Trusted,
        };
    }

    active(
        DecisionReason::Untrusted,
        "Untrusted SSID",
        format!("Active: {} (untrusted SSID)", node),
    )
}

/// Log line for a controller call, e.g. `[Activate] via Cellular (cellular)`
pub fn describe_action(action: ControlAction, result: &EvaluationResult) -> String {
    let verb = match action {
        ControlAction::Activate => "Activate",
        ControlAction::Deactivate => "Deactivate",
        ControlAction::None => "Keep",
    };
    format!(
        "[{}] via {} ({})",
        verb,
        result.status_label,
        result.reason.as_str()
    )
}

/// Evaluate one tick: decide, debounce, and invoke the controller if needed.
///
/// Controller failures are logged and leave `last_command` untouched so the
/// next tick tries again. A configuration rejection is warned about once until
/// it changes or a command succeeds.
pub async fn evaluate<C: ExitNodeControl>(
    state: &ConnectivityState,
    config: &Config,
    memory: &mut EvaluatorMemory,
    controller: &C,
) -> EvaluationResult {
    let result = decide(state, config);

    let action = memory.plan(state, &result);
    let command = match action {
        ControlAction::Activate => ExitNodeCommand::Activated,
        ControlAction::Deactivate => ExitNodeCommand::Deactivated,
        ControlAction::None => return result,
    };
    log::info!("{}", describe_action(action, &result));

    match controller.apply(command).await {
        Ok(output) => {
            if !output.is_empty() {
                log::debug!("VPN client output: {}", output);
            }
            memory.record(command);
        }
        Err(e @ ExitNodeError::ConfigurationInvalid(_)) => {
            let message = e.to_string();
            if memory.note_rejection(&message) {
                log::warn!("Exit node {:?} skipped: {}", command, message);
            } else {
                log::debug!("Exit node {:?} still skipped: {}", command, message);
            }
        }
        Err(e) => {
            log::warn!("Exit node {:?} failed, will retry next tick: {}", command, e);
        }
    }

    result
}
