// Tailscale exit-node controller

//! Exit-node control
//!
//! Wraps the external VPN client binary. Every invocation first validates the
//! binary path and the exit-node name; nothing is spawned when either check
//! fails. Arguments are passed as a structured list, never through a shell.

use crate::error::{ExitNodeError, Result};
use crate::types::{Config, ExitNodeCommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Upper bound for one `tailscale up` call (a logged-out client waits for auth)
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can switch the exit node on and off
#[allow(async_fn_in_trait)]
pub trait ExitNodeControl {
    /// Route all traffic through the exit node
    async fn activate(&self) -> Result<String>;

    /// Stop routing through the exit node
    async fn deactivate(&self) -> Result<String>;

    /// Dispatch on the desired command
    async fn apply(&self, command: ExitNodeCommand) -> Result<String> {
        match command {
            ExitNodeCommand::Activated => self.activate().await,
            ExitNodeCommand::Deactivated => self.deactivate().await,
        }
    }
}

/// Validates that a name is safe to pass to an external command.
/// Only allows alphanumeric characters, hyphens, and underscores.
pub fn validate_name(name: &str, field_name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ExitNodeError::ConfigurationInvalid(format!(
            "{} cannot be empty",
            field_name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ExitNodeError::ConfigurationInvalid(format!(
            "{} contains invalid characters: '{}'. Only alphanumeric, hyphens, and underscores are allowed",
            field_name, name
        )));
    }

    Ok(())
}

/// Checks that `path` is absolute, exists, is a regular file and carries the
/// platform executable extension (none on Unix).
pub fn validate_binary_path(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(ExitNodeError::ConfigurationInvalid(format!(
            "VPN client path must be absolute: {}",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(path).map_err(|e| {
        ExitNodeError::ConfigurationInvalid(format!(
            "VPN client not found at {}: {}",
            path.display(),
            e
        ))
    })?;

    if metadata.is_dir() {
        return Err(ExitNodeError::ConfigurationInvalid(format!(
            "VPN client path is a directory: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if extension != std::env::consts::EXE_EXTENSION {
        return Err(ExitNodeError::ConfigurationInvalid(format!(
            "VPN client path has unexpected extension: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Command-line arguments for `tailscale up`
pub fn command_args(command: ExitNodeCommand, exit_node: &str) -> Vec<String> {
    match command {
        ExitNodeCommand::Activated => vec![
            "up".to_string(),
            format!("--exit-node={}", exit_node),
            "--accept-dns=true".to_string(),
            "--shields-up".to_string(),
        ],
        ExitNodeCommand::Deactivated => vec![
            "up".to_string(),
            "--exit-node=".to_string(),
            "--accept-dns=false".to_string(),
            "--shields-up".to_string(),
        ],
    }
}

/// Controller driving the `tailscale` CLI
pub struct TailscaleController {
    binary: PathBuf,
    exit_node: String,
    timeout: Duration,
}

impl TailscaleController {
    /// Create a controller for the given binary and exit node.
    ///
    /// Nothing is validated here; validation happens on every call so a
    /// binary installed after startup is picked up.
    pub fn new(binary: PathBuf, exit_node: String) -> Self {
        Self {
            binary,
            exit_node,
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a controller from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tailscale_path.clone(),
            config.exit_node_name().to_string(),
        )
    }

    /// Whether the configured binary exists (checked once at startup)
    pub fn binary_exists(&self) -> bool {
        self.binary.exists()
    }

    /// Get the exit node name
    pub fn exit_node(&self) -> &str {
        &self.exit_node
    }

    async fn run(&self, command: ExitNodeCommand) -> Result<String> {
        validate_binary_path(&self.binary)?;
        validate_name(&self.exit_node, "Exit node name")?;

        let args = command_args(command, &self.exit_node);
        log::debug!("Running {} {}", self.binary.display(), args.join(" "));

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args).kill_on_drop(true);
        #[cfg(target_os = "windows")]
        cmd.creation_flags(crate::probe::CREATE_NO_WINDOW);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ExitNodeError::CommandFailed {
                status: format!("timed out after {:?}", self.timeout),
                output: String::new(),
            })?
            .map_err(|e| ExitNodeError::CommandFailed {
                status: format!("launch failed: {}", e),
                output: String::new(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if !output.status.success() {
            return Err(ExitNodeError::CommandFailed {
                status: output.status.to_string(),
                output: combined,
            });
        }

        Ok(combined)
    }
}

impl ExitNodeControl for TailscaleController {
    async fn activate(&self) -> Result<String> {
        self.run(ExitNodeCommand::Activated).await
    }

    async fn deactivate(&self) -> Result<String> {
        self.run(ExitNodeCommand::Deactivated).await
    }
}
