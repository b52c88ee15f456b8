// Tailscale Exit-Node Automation Daemon

use anyhow::{Context, Result};
use auto_exit_node::{
    agent::Agent,
    config::load_config,
    controller::TailscaleController,
    probe::ConnectivityProbe,
    scheduler::{Scheduler, Trigger, TriggerHandle},
    status::StatusPublisher,
    types::StatusReport,
};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "auto-exit-node")]
#[command(version, about = "Toggle the Tailscale exit node based on the current network", long_about = None)]
struct Args {
    /// Path to configuration file (JSON, or TOML with a .toml extension)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Write status to this file (overrides statusFile in the configuration)
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Run a single evaluation, print the status as JSON and exit
    #[arg(long)]
    once: bool,
}

/// Install shutdown handlers; the returned future resolves on SIGTERM/SIGINT
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to set up SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => log::info!("Received SIGTERM"),
            _ = sigint.recv() => log::info!("Received SIGINT"),
        }
    })
}

/// Install shutdown handlers; the returned future resolves on Ctrl-C
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl-C"),
            Err(e) => {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}

/// Forward SIGUSR1 as a force-sync request
#[cfg(unix)]
fn spawn_force_sync_listener(triggers: TriggerHandle) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigusr1 =
        signal(SignalKind::user_defined1()).context("Failed to set up SIGUSR1 handler")?;

    tokio::spawn(async move {
        while sigusr1.recv().await.is_some() {
            log::info!("Received SIGUSR1, forcing sync");
            triggers.request(Trigger::ForceSync);
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_force_sync_listener(_triggers: TriggerHandle) -> Result<()> {
    Ok(())
}

/// Wake the scheduler on NetworkManager connection changes
#[cfg(target_os = "linux")]
fn spawn_network_watcher(triggers: TriggerHandle) {
    use auto_exit_node::nm_watch::NetworkWatcher;

    tokio::spawn(async move {
        let watcher = match NetworkWatcher::new().await {
            Ok(watcher) => watcher,
            Err(e) => {
                log::warn!("Network change wake-up disabled: {:#}", e);
                return;
            }
        };
        if let Err(e) = watcher.watch(triggers).await {
            log::warn!("Network watcher stopped: {:#}", e);
        }
    });
}

#[cfg(not(target_os = "linux"))]
fn spawn_network_watcher(_triggers: TriggerHandle) {}

fn main() -> Result<()> {
    // 2 threads is sufficient: 1 for the evaluation loop, 1 for watchers + process spawns
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("auto-exit-node")
        .enable_time()
        .enable_io()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    let loaded = load_config(&args.config);
    let mut config = loaded.config;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    for notice in &loaded.notices {
        log::warn!("Config: {}", notice);
    }

    if args.status_file.is_some() {
        config.status_file = args.status_file.clone();
    }

    log::info!("Starting auto-exit-node {}", env!("CARGO_PKG_VERSION"));
    log::info!("VPN client: {}", config.tailscale_path.display());
    log::info!("Exit node: {}", config.exit_node_name());
    log::info!("Trusted SSIDs: {:?}", config.trusted_ssids);

    let controller = TailscaleController::from_config(&config);
    let tailscale_available = controller.binary_exists();
    if !tailscale_available {
        log::warn!(
            "Tailscale not found at {}, exit node control disabled",
            config.tailscale_path.display()
        );
    }

    let probe = ConnectivityProbe::for_platform(&config);
    let status = StatusPublisher::new(StatusReport::initializing(), config.status_file.clone());
    let period = Duration::from_secs(config.check_interval_secs);
    let mut agent = Agent::new(config, probe, controller, status, tailscale_available);

    if args.once {
        let report = agent.tick(Trigger::ForceSync).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        agent.status().cleanup();
        return Ok(());
    }

    let mut scheduler = Scheduler::new(period);
    spawn_force_sync_listener(scheduler.handle())?;
    spawn_network_watcher(scheduler.handle());

    log::info!("Checking every {}s", period.as_secs());

    let shutdown = shutdown_signal()?;
    agent.run(&mut scheduler, shutdown).await;

    agent.status().cleanup();
    log::info!("Shutdown complete");
    Ok(())
}
