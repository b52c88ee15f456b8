// Tailscale Exit-Node Automation Library
// Shared modules for daemon and tests

#![warn(missing_docs)]

//! Tailscale Exit-Node Automation Library
//!
//! This library provides the core functionality for automatically enabling and
//! disabling a Tailscale exit node depending on the network the host is on:
//! trusted WiFi networks route normally, everything else (unknown or untrusted
//! WiFi, cellular, lost internet) goes through the exit node.
//!
//! # Main Components
//!
//! - [`agent`]: Evaluation loop tying everything together
//! - [`config`]: Configuration file parsing
//! - [`controller`]: VPN client invocation and input validation
//! - [`error`]: Error taxonomy
//! - [`evaluator`]: Decision table and debounce state machine
//! - [`probe`]: WiFi, cellular and internet reachability sampling
//! - [`scheduler`]: Periodic and on-demand evaluation triggers
//! - [`status`]: Status publishing for UI collaborators
//! - [`trust`]: Trusted SSID matching
//! - [`types`]: Shared data structures

pub mod agent;
pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
#[cfg(target_os = "linux")]
pub mod nm_watch;
pub mod probe;
pub mod scheduler;
pub mod status;
pub mod trust;
pub mod types;
