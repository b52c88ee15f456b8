// Status publishing for UI collaborators
//!
//! Publishes the latest [`StatusReport`] on a watch channel and, optionally,
//! to a key=value file for tray widgets and shell scripts.

use crate::types::StatusReport;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::watch;

/// Render a status report as the status file contents
pub fn render(report: &StatusReport) -> String {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    format!(
        "STATUS={}\nTOOLTIP={}\nICON={}\nTAILSCALE={}\nTIMESTAMP={}\n",
        report.status_label,
        report.tooltip,
        report.icon.as_str(),
        if report.tailscale_available {
            "available"
        } else {
            "missing"
        },
        timestamp
    )
}

/// Write current status to the status file
pub fn write_status(path: &Path, report: &StatusReport) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).context("Failed to create status directory")?;
        }
    }

    fs::write(path, render(report)).context("Failed to write status file")?;

    Ok(())
}

/// Fan-out point for status updates
pub struct StatusPublisher {
    tx: watch::Sender<StatusReport>,
    file: Option<PathBuf>,
}

impl StatusPublisher {
    /// Create a publisher holding the initial report
    pub fn new(initial: StatusReport, file: Option<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, file }
    }

    /// Subscribe to status updates
    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.tx.subscribe()
    }

    /// Latest published report
    pub fn current(&self) -> StatusReport {
        self.tx.borrow().clone()
    }

    /// Publish a report to subscribers and the status file
    pub fn publish(&self, report: StatusReport) {
        if self.tx.borrow().status_label != report.status_label {
            log::info!("Status: {}", report.status_label);
        }

        if let Some(path) = &self.file {
            if let Err(e) = write_status(path, &report) {
                log::warn!("Failed to write status file {}: {:#}", path.display(), e);
            }
        }

        self.tx.send_replace(report);
    }

    /// Remove the status file on shutdown
    pub fn cleanup(&self) {
        if let Some(path) = &self.file {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IconKind;

    fn trusted() -> StatusReport {
        StatusReport {
            status_label: "Trusted SSID: Home".to_string(),
            tooltip: "Inactive: trusted network (Home)".to_string(),
            icon: IconKind::Inactive,
            tailscale_available: true,
        }
    }

    #[test]
    fn test_render_fields() {
        let content = render(&trusted());
        assert!(content.starts_with("STATUS=Trusted SSID: Home\n"));
        assert!(content.contains("TOOLTIP=Inactive: trusted network (Home)\n"));
        assert!(content.contains("ICON=inactive\n"));
        assert!(content.contains("TAILSCALE=available\n"));
        assert!(content.contains("TIMESTAMP="));
    }

    #[test]
    fn test_render_missing_tailscale() {
        let content = render(&StatusReport::unavailable());
        assert!(content.contains("TAILSCALE=missing\n"));
    }

    #[test]
    fn test_publish_notifies_subscribers() {
        let publisher = StatusPublisher::new(StatusReport::initializing(), None);
        let mut rx = publisher.subscribe();
        assert_eq!(rx.borrow().status_label, "Initializing...");

        publisher.publish(trusted());

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status_label, "Trusted SSID: Home");
        assert_eq!(publisher.current(), trusted());
    }

    #[test]
    fn test_publish_writes_and_cleanup_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("status");
        let publisher = StatusPublisher::new(StatusReport::initializing(), Some(path.clone()));

        publisher.publish(trusted());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("STATUS=Trusted SSID: Home"));

        publisher.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn test_publish_survives_unwritable_file() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = StatusPublisher::new(
            StatusReport::initializing(),
            Some(dir.path().to_path_buf()),
        );

        publisher.publish(trusted());
        assert_eq!(publisher.current(), trusted());
    }
}
