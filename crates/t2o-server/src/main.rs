//! Tap2Open bridge
//!
//! Main entry point: loads `bridge.yaml`, publishes gates to an in-process
//! accessory framework and supervises the vendor session until Ctrl-C.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use t2o_accessory::{AccessoryEvent, LocalAccessories};
use t2o_bridge::Bridge;
use t2o_config::BridgeConfig;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the configuration directory
const CONFIG_DIR_ENV: &str = "T2O_CONFIG_DIR";

fn config_dir() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_DIR_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Log every change the bridge pushes to the framework
fn spawn_event_logger(mut events: broadcast::Receiver<AccessoryEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AccessoryEvent::Registered(descriptor)) => {
                    info!(
                        key = %descriptor.key,
                        name = %descriptor.display_name,
                        serial = %descriptor.serial_number,
                        "Accessory registered"
                    );
                }
                Ok(AccessoryEvent::StateUpdated { key, update }) => {
                    info!(
                        key = %key,
                        characteristic = update.characteristic(),
                        value = update.hap_value(),
                        "Accessory updated"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event logger lagged by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_dir = config_dir();
    info!(config_dir = %config_dir.display(), "Starting Tap2Open bridge");

    let config = BridgeConfig::load(&config_dir)
        .with_context(|| format!("invalid configuration in {}", config_dir.display()))?;

    let accessories = Arc::new(LocalAccessories::new());
    spawn_event_logger(accessories.subscribe());

    let bridge = Bridge::new(&config, accessories.clone());
    bridge.start();

    info!(name = %bridge.name(), "Bridge is running");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    bridge.stop();

    Ok(())
}
