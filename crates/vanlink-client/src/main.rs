//! Vanlink replay tool entry point.
//!
//! Drives the client stack headlessly: a capture of what a peripheral sent is
//! pushed through an in-memory link into a freshly built system aggregate, every
//! snapshot change is logged, and the final snapshots are printed as JSON.
//!
//! # Usage
//!
//! ```text
//! vanlink [--config <PATH>] replay <water|heater|battery> <CAPTURE> [--remember]
//! vanlink [--config <PATH>] devices
//! vanlink [--config <PATH>] forget <water|heater|battery>
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from()        -- ClientConfig, defaults when missing
//!  └─ tracing_subscriber        -- RUST_LOG, else general.log_level
//!  └─ replay
//!       ├─ MemoryLink::new(device_id)
//!       ├─ WaterSystem / HeaterSystem / BatterySystem
//!       ├─ replay(capture)      -- chunks into monitored characteristics
//!       └─ disconnect()         -- dispose + cancel the link once
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vanlink_client::infrastructure::link::memory::MemoryLink;
use vanlink_client::infrastructure::link::PeripheralLink;
use vanlink_client::infrastructure::replay::{load_capture, replay, Capture, Family};
use vanlink_client::infrastructure::storage::config::{config_file_path, load_config_from, ClientConfig};
use vanlink_client::infrastructure::storage::toml_store::TomlDeviceStore;
use vanlink_client::infrastructure::storage::{DeviceInfo, DeviceStore, ModuleKey};
use vanlink_client::systems::{BatterySystem, HeaterSystem, WaterSystem};
use vanlink_core::domain::battery::format_remaining_time;
use vanlink_core::{Observable, Subscription};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Vanlink peripheral replay tool.
#[derive(Debug, Parser)]
#[command(name = "vanlink", about = "Replays captured Vanlink peripheral traffic", version)]
struct Cli {
    /// Configuration file.  Defaults to `config.toml` in the platform config
    /// directory.
    #[arg(long, env = "VANLINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replays a capture file and prints the resulting snapshots.
    Replay {
        #[arg(value_enum)]
        family: Family,

        /// TOML capture of the peripheral's notifications.
        capture: PathBuf,

        /// Remember the captured peripheral as the module's last device.
        #[arg(long)]
        remember: bool,
    },

    /// Lists the remembered device of every module.
    Devices,

    /// Forgets the remembered device of one module.
    Forget { module: ModuleKey },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config_file_path()?,
    };
    let config = load_config_from(&config_path)
        .with_context(|| format!("cannot load configuration from {}", config_path.display()))?;

    // Initialise structured logging.  `RUST_LOG` wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let store = TomlDeviceStore::new(config.device_store_path(config_dir));

    match cli.command {
        Command::Replay {
            family,
            capture,
            remember,
        } => {
            let capture = load_capture(&capture)?;
            info!(device = %capture.device_id, family = ?family, chunks = capture.chunks.len(), "replaying capture");
            let snapshot = run_replay(&config, family, &capture).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);

            if remember {
                let device = DeviceInfo {
                    id: capture.device_id.clone(),
                    name: capture.device_name.clone().unwrap_or_else(|| default_name(family)),
                };
                store.set(family.into(), device).await?;
                info!(path = %store.path().display(), "device remembered");
            }
        }

        Command::Devices => {
            for module in [ModuleKey::Water, ModuleKey::Heater, ModuleKey::Battery] {
                match store.get(module).await? {
                    Some(device) => println!("{module}: {} ({})", device.name, device.id),
                    None => println!("{module}: -"),
                }
            }
        }

        Command::Forget { module } => {
            store.clear(module).await?;
            info!(%module, "device forgotten");
        }
    }

    Ok(())
}

// ── Replay ────────────────────────────────────────────────────────────────────

/// Builds the aggregate for `family`, feeds it `capture` and returns its final
/// snapshot as JSON.
async fn run_replay(config: &ClientConfig, family: Family, capture: &Capture) -> anyhow::Result<serde_json::Value> {
    let link = Arc::new(MemoryLink::new(capture.device_id.clone()));
    let shared: Arc<dyn PeripheralLink> = link.clone();

    match family {
        Family::Water => {
            let system = WaterSystem::with_options(shared, config.drain_valve_options());
            let _watch = [
                log_changes("water/admin", &system.admin),
                log_changes("water/clean_tank", &system.clean_tank),
                log_changes("water/grey_tank", &system.grey_tank),
                log_changes("water/grey_valve", &system.grey_drain_valve),
            ];
            feed(&link, family, capture).await?;
            let snapshot = system.snapshot();
            system.disconnect().await?;
            to_json(&snapshot)
        }
        Family::Heater => {
            let system = HeaterSystem::with_options(shared, config.heater_zone_options());
            let mut watch = vec![
                log_changes("heater/admin", &system.admin),
                log_changes("heater/environment", &system.environment),
            ];
            for zone in &system.zones {
                watch.push(log_changes(format!("heater/zone{}", zone.zone_index()), zone));
            }
            feed(&link, family, capture).await?;
            let snapshot = system.snapshot();
            system.disconnect().await?;
            to_json(&snapshot)
        }
        Family::Battery => {
            let system = BatterySystem::new(shared);
            let _watch = log_changes("battery/bms", &system.monitor);
            feed(&link, family, capture).await?;
            let snapshot = system.snapshot();
            info!(
                soc = snapshot.percentage,
                remaining = %format_remaining_time(snapshot.remaining_time_hours()),
                "battery state"
            );
            system.disconnect().await?;
            to_json(&snapshot)
        }
    }
}

/// Lets the initial requests go out, replays the capture, then lets any
/// follow-up work settle.
async fn feed(link: &MemoryLink, family: Family, capture: &Capture) -> anyhow::Result<()> {
    settle().await;
    let stats = replay(link, family, capture)?;
    settle().await;

    if stats.delivered < stats.chunks {
        warn!(dropped = stats.chunks - stats.delivered, "some chunks reached no channel");
    }
    info!(
        chunks = stats.chunks,
        bytes = stats.bytes,
        writes = link.writes().len(),
        "replay finished"
    );
    Ok(())
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn log_changes<T, O>(name: impl Into<String>, object: &O) -> Subscription
where
    T: std::fmt::Debug + 'static,
    O: Observable<T>,
{
    let name = name.into();
    object.subscribe(Box::new(move |value: &T| {
        info!(object = %name, snapshot = ?value, "snapshot changed");
    }))
}

fn to_json<T: Serialize>(snapshot: &T) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(snapshot)?)
}

fn default_name(family: Family) -> String {
    let module = match family {
        Family::Water => "Water",
        Family::Heater => "Heater",
        Family::Battery => "Battery",
    };
    format!("Vanlink {module}")
}
