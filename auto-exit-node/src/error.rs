// Error taxonomy for probes and exit-node control

//! Error types
//!
//! None of these errors is fatal. Probe failures degrade to "no data",
//! controller failures are logged and retried on a later tick.

/// Library-level error
#[derive(Debug, thiserror::Error)]
pub enum ExitNodeError {
    /// An OS query failed or timed out
    #[error("probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// Binary path or exit-node name failed validation
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The VPN client ran (or failed to launch) and reported failure
    #[error("command failed ({status}): {output}")]
    CommandFailed {
        /// Exit status or launch error
        status: String,
        /// Combined stdout/stderr
        output: String,
    },
}

impl ExitNodeError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            ExitNodeError::ProbeUnavailable(_) => "ProbeUnavailable",
            ExitNodeError::ConfigurationInvalid(_) => "ConfigurationInvalid",
            ExitNodeError::CommandFailed { .. } => "CommandFailed",
        }
    }
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, ExitNodeError>;
