// NetworkManager change watcher via D-Bus

//! Network change detection via D-Bus
//!
//! Watches NetworkManager's primary connection and requests an evaluation
//! whenever it changes, so joining or leaving a network does not wait for the
//! next periodic tick. Linux only.

use crate::scheduler::{Trigger, TriggerHandle};
use anyhow::{Context, Result};
use futures_util::stream::StreamExt;
use zbus::{proxy, Connection};

/// D-Bus proxy for NetworkManager
#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
trait NetworkManager {
    /// Get the primary connection object path
    #[zbus(property)]
    fn primary_connection(&self) -> zbus::Result<zbus::zvariant::OwnedObjectPath>;
}

/// Primary-connection watcher
pub struct NetworkWatcher {
    connection: Connection,
}

impl NetworkWatcher {
    /// Connect to the system bus
    pub async fn new() -> Result<Self> {
        let connection = Connection::system()
            .await
            .context("Failed to connect to system D-Bus")?;

        Ok(Self { connection })
    }

    /// Request an evaluation on every primary connection change.
    ///
    /// Returns when the signal stream ends.
    pub async fn watch(&self, triggers: TriggerHandle) -> Result<()> {
        let nm = NetworkManagerProxy::new(&self.connection)
            .await
            .context("Failed to create NetworkManager proxy")?;
        let mut stream = nm.receive_primary_connection_changed().await;

        log::info!("Watching NetworkManager for network changes");

        while let Some(change) = stream.next().await {
            match change.get().await {
                Ok(path) => log::debug!("Primary connection changed: {}", path.as_str()),
                Err(e) => log::debug!("Primary connection changed (unreadable: {})", e),
            }
            triggers.request(Trigger::NetworkChanged);
        }

        Ok(())
    }
}

