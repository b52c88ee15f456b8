// Shared types between probe, evaluator and controller

//! Shared data structures
//!
//! This module defines the data passed between components: the immutable
//! configuration, the per-tick connectivity snapshot, the evaluation outcome
//! and the status report handed to UI collaborators.

use serde::Serialize;
use std::path::PathBuf;

/// Exit node used when `exitNodes` is empty
pub const DEFAULT_EXIT_NODE: &str = "homeassistant";

/// Default evaluation period (seconds)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 15;

#[cfg(target_os = "windows")]
const DEFAULT_TAILSCALE_PATH: &str = "C:\\Program Files\\Tailscale\\tailscale.exe";

#[cfg(not(target_os = "windows"))]
const DEFAULT_TAILSCALE_PATH: &str = "/usr/bin/tailscale";

/// Main configuration structure
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Absolute path to the VPN client binary
    pub tailscale_path: PathBuf,
    /// Networks on which the exit node is switched off
    pub trusted_ssids: Vec<String>,
    /// Candidate exit nodes, only the first one is used
    pub exit_nodes: Vec<String>,
    /// WiFi interface to query on Linux (auto-detected when unset)
    pub wifi_interface: Option<String>,
    /// Seconds between periodic evaluations
    pub check_interval_secs: u64,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
    /// Optional key=value status file for external tools
    pub status_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tailscale_path: PathBuf::from(DEFAULT_TAILSCALE_PATH),
            trusted_ssids: Vec::new(),
            exit_nodes: Vec::new(),
            wifi_interface: None,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            log_level: "info".to_string(),
            status_file: None,
        }
    }
}

impl Config {
    /// Name of the exit node to route through
    pub fn exit_node_name(&self) -> &str {
        self.exit_nodes
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_EXIT_NODE)
    }
}

/// Connectivity snapshot taken at the start of every tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityState {
    /// Current WiFi network, `None` when not associated or unknown
    pub ssid: Option<String>,
    /// Whether a mobile broadband link is up
    pub cellular_connected: bool,
    /// Whether a public resolver answered a TCP dial
    pub internet_reachable: bool,
}

/// Desired exit-node state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitNodeCommand {
    /// Route traffic through the exit node
    Activated,
    /// Route traffic normally
    Deactivated,
}

/// Tray icon variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    /// Exit node in use
    Active,
    /// Exit node off or unknown
    Inactive,
}

impl IconKind {
    /// Lowercase name used in the status file
    pub fn as_str(self) -> &'static str {
        match self {
            IconKind::Active => "active",
            IconKind::Inactive => "inactive",
        }
    }
}

/// Which rule of the decision table matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Mobile broadband link is up
    Cellular,
    /// No SSID could be determined
    UnknownNetwork,
    /// Public resolvers unreachable
    NoInternet,
    /// SSID is on the trusted list
    Trusted,
    /// SSID is not on the trusted list
    Untrusted,
}

impl DecisionReason {
    /// Short name used in log lines
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::Cellular => "cellular",
            DecisionReason::UnknownNetwork => "unknown network",
            DecisionReason::NoInternet => "no internet",
            DecisionReason::Trusted => "trusted",
            DecisionReason::Untrusted => "untrusted",
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Short status shown in the tray menu
    pub status_label: String,
    /// Longer hover text
    pub tooltip: String,
    /// Icon to display
    pub icon: IconKind,
    /// Exit-node state the network calls for
    pub command: ExitNodeCommand,
    /// Matched rule
    pub reason: DecisionReason,
}

/// Status exposed to UI collaborators after every tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Short status shown in the tray menu
    pub status_label: String,
    /// Longer hover text
    pub tooltip: String,
    /// Icon to display
    pub icon: IconKind,
    /// Whether the VPN client binary was found at startup
    pub tailscale_available: bool,
}

impl StatusReport {
    /// Report shown before the first tick completes
    pub fn initializing() -> Self {
        Self {
            status_label: "Initializing...".to_string(),
            tooltip: "AutoExitNode - Tailscale controller".to_string(),
            icon: IconKind::Inactive,
            tailscale_available: true,
        }
    }

    /// Report shown when the VPN client binary is missing
    pub fn unavailable() -> Self {
        Self {
            status_label: "Tailscale not found".to_string(),
            tooltip: "Tailscale not found! Please install Tailscale.".to_string(),
            icon: IconKind::Inactive,
            tailscale_available: false,
        }
    }

    /// Report derived from an evaluation
    pub fn from_result(result: &EvaluationResult) -> Self {
        Self {
            status_label: result.status_label.clone(),
            tooltip: result.tooltip.clone(),
            icon: result.icon,
            tailscale_available: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_node_name_defaults() {
        let config = Config::default();
        assert_eq!(config.exit_node_name(), "homeassistant");
    }

    #[test]
    fn test_exit_node_name_uses_first_entry() {
        let config = Config {
            exit_nodes: vec!["router".to_string(), "vpn-node".to_string()],
            ..Config::default()
        };
        assert_eq!(config.exit_node_name(), "router");
    }

    #[test]
    fn test_status_report_serializes_camel_case() {
        let json = serde_json::to_value(StatusReport::unavailable()).unwrap();
        assert_eq!(json["statusLabel"], "Tailscale not found");
        assert_eq!(json["icon"], "inactive");
        assert_eq!(json["tailscaleAvailable"], false);
    }

    #[test]
    fn test_status_report_from_result() {
        let result = EvaluationResult {
            status_label: "Cellular".to_string(),
            tooltip: "Active: homeassistant via cellular".to_string(),
            icon: IconKind::Active,
            command: ExitNodeCommand::Activated,
            reason: DecisionReason::Cellular,
        };
        let report = StatusReport::from_result(&result);
        assert_eq!(report.status_label, "Cellular");
        assert_eq!(report.icon, IconKind::Active);
        assert!(report.tailscale_available);
    }
}
