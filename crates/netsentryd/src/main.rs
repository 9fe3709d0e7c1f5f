//! Netsentry daemon - wireless connectivity watchdog.
//!
//! Keeps the host on a working network: monitors connectivity on a fixed
//! cadence and, when it degrades, drives the interface back onto the best
//! available known network, gently first and forcefully if needed.

use anyhow::{Context, Result};
use clap::Parser;
use netsentryd::config::Config;
use netsentryd::monitor::Monitor;
use netsentryd::platform::macos::MacosAirportPort;
use netsentryd::port::{NetworkPort, SystemClock};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netsentryd")]
#[command(about = "Wireless connectivity watchdog with ranked failover", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!("netsentryd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    config.validate().context("invalid configuration")?;

    let profiles = config.profiles();
    info!(
        "primary networks: {} (by preference)",
        config.networks.primary_ssids.join(", ")
    );
    info!(
        "secondary network: {} (last resort)",
        config.networks.secondary_ssid
    );

    let port = MacosAirportPort::new(&config);
    if let Err(e) = port.set_preferred_networks(&profiles).await {
        warn!("could not rank preferred networks, continuing anyway: {e}");
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut monitor = Monitor::new(&config, port, SystemClock);
    monitor.run(&mut shutdown_rx).await;

    info!("shutting down gracefully");
    println!("{}", monitor.stats().summary());

    Ok(())
}
