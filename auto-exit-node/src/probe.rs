// Connectivity probe

//! Connectivity sampling
//!
//! Determines the current WiFi SSID, whether a cellular link is up and whether
//! the internet is reachable. The three sub-probes run concurrently and each
//! one degrades independently: any failure or timeout is logged at debug level
//! and reported as `None`/`false`, never as an error.

use crate::error::{ExitNodeError, Result};
use crate::types::{Config, ConnectivityState};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;

/// Hide the console window of spawned processes
#[cfg(target_os = "windows")]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Upper bound for a single OS query
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for a single reachability dial
const DIAL_TIMEOUT: Duration = Duration::from_secs(2);

/// Public DNS resolvers dialled in order on port 53
pub const DEFAULT_RESOLVERS: [SocketAddr; 2] = [
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 53)),
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(1, 1, 1, 1), 53)),
];

/// An OS command whose stdout is line-oriented text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsQuery {
    program: String,
    args: Vec<String>,
}

impl OsQuery {
    /// Create a query from a program and its arguments
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Run the query and return its stdout.
    ///
    /// The child is killed if it outlives `timeout`.
    pub async fn run(&self, timeout: Duration) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        #[cfg(target_os = "windows")]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| {
                ExitNodeError::ProbeUnavailable(format!("{} timed out", self.program))
            })?
            .map_err(|e| {
                ExitNodeError::ProbeUnavailable(format!("failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            return Err(ExitNodeError::ProbeUnavailable(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extract the first `SSID : <value>` field.
///
/// Matches `netsh wlan show interfaces` and `iw dev <iface> link` output.
/// `BSSID` lines and empty values are not SSIDs.
pub fn parse_ssid(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "SSID")
        .map(|(_, value)| value.trim().to_string())
        .filter(|ssid| !ssid.is_empty())
}

/// True if any line mentions both "state" and "connected" (case-insensitive)
pub fn parse_cellular(output: &str) -> bool {
    output.lines().any(|line| {
        let line = line.to_lowercase();
        line.contains("state") && line.contains("connected")
    })
}

/// Dial each resolver in turn; true as soon as one accepts.
///
/// The stream is dropped (closed) immediately after connecting.
pub async fn check_internet(resolvers: &[SocketAddr], timeout: Duration) -> bool {
    for addr in resolvers {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                return true;
            }
            Ok(Err(e)) => log::debug!("Reachability dial to {} failed: {}", addr, e),
            Err(_) => log::debug!("Reachability dial to {} timed out", addr),
        }
    }
    false
}

/// Find a wireless interface by checking /sys/class/net/*/wireless
#[cfg(target_os = "linux")]
fn detect_wireless_interface() -> Option<String> {
    let entries = std::fs::read_dir("/sys/class/net").ok()?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().join("wireless").exists())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.into_iter().next()
}

#[cfg(target_os = "windows")]
fn platform_queries(_config: &Config) -> (Option<OsQuery>, Option<OsQuery>) {
    (
        Some(OsQuery::new("netsh", &["wlan", "show", "interfaces"])),
        Some(OsQuery::new("netsh", &["mbn", "show", "interfaces"])),
    )
}

#[cfg(target_os = "linux")]
fn platform_queries(config: &Config) -> (Option<OsQuery>, Option<OsQuery>) {
    let iface = match config.wifi_interface.clone() {
        Some(iface) => Some(iface),
        None => {
            let detected = detect_wireless_interface();
            match &detected {
                Some(iface) => log::info!("Auto-detected wireless interface: {}", iface),
                None => log::info!("No wireless interface found, SSID lookup disabled"),
            }
            detected
        }
    };

    let wifi = iface.and_then(|iface| {
        match crate::controller::validate_name(&iface, "WiFi interface name") {
            Ok(()) => Some(OsQuery::new("iw", &["dev", iface.as_str(), "link"])),
            Err(e) => {
                log::warn!("{}, SSID lookup disabled", e);
                None
            }
        }
    });

    (wifi, Some(OsQuery::new("mmcli", &["-m", "any"])))
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
fn platform_queries(_config: &Config) -> (Option<OsQuery>, Option<OsQuery>) {
    log::warn!("No connectivity queries for this platform, SSID and cellular lookups disabled");
    (None, None)
}

/// Samples connectivity state
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    wifi_query: Option<OsQuery>,
    cellular_query: Option<OsQuery>,
    resolvers: Vec<SocketAddr>,
    query_timeout: Duration,
    dial_timeout: Duration,
}

impl ConnectivityProbe {
    /// Probe using explicit queries and resolvers
    pub fn new(
        wifi_query: Option<OsQuery>,
        cellular_query: Option<OsQuery>,
        resolvers: Vec<SocketAddr>,
    ) -> Self {
        Self {
            wifi_query,
            cellular_query,
            resolvers,
            query_timeout: QUERY_TIMEOUT,
            dial_timeout: DIAL_TIMEOUT,
        }
    }

    /// Probe using the platform's OS queries and public resolvers
    pub fn for_platform(config: &Config) -> Self {
        let (wifi, cellular) = platform_queries(config);
        Self::new(wifi, cellular, DEFAULT_RESOLVERS.to_vec())
    }

    /// Override the per-query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Take a fresh connectivity snapshot
    pub async fn probe(&self) -> ConnectivityState {
        let (ssid, cellular_connected, internet_reachable) = tokio::join!(
            self.current_ssid(),
            self.is_cellular_connected(),
            check_internet(&self.resolvers, self.dial_timeout),
        );

        ConnectivityState {
            ssid,
            cellular_connected,
            internet_reachable,
        }
    }

    async fn current_ssid(&self) -> Option<String> {
        let query = self.wifi_query.as_ref()?;
        match query.run(self.query_timeout).await {
            Ok(output) => parse_ssid(&output),
            Err(e) => {
                log::debug!("SSID lookup degraded: {}", e);
                None
            }
        }
    }

    async fn is_cellular_connected(&self) -> bool {
        let Some(query) = self.cellular_query.as_ref() else {
            return false;
        };
        match query.run(self.query_timeout).await {
            Ok(output) => parse_cellular(&output),
            Err(e) => {
                log::debug!("Cellular lookup degraded: {}", e);
                false
            }
        }
    }
}
