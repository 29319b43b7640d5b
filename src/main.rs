//! SLS node — host entry point.
//!
//! Runs the session engine against simulated collaborators and real UDP
//! sockets.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedHardware          UdpNetwork          logging        │
//! │  (Routing+Radio+Sensor+     (NetworkPort)       (tracing fmt)  │
//! │   Actuator+Indicator+System)                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              NodeService (pure logic)                  │    │
//! │  │  FSM · SequenceGuard · Alerts · Supervisor             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime (edge-executor tasks, embassy-sync channels)          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `sls-node [config.json]`

use std::fs;

use anyhow::{Context, Result};
use log::info;

use sls_node::adapters::logging;
use sls_node::adapters::sim::SimulatedHardware;
use sls_node::config::NodeConfig;
use sls_node::runtime;

fn load_config() -> Result<NodeConfig> {
    let Some(path) = std::env::args().nth(1) else {
        info!("Config: built-in defaults");
        return Ok(NodeConfig::default());
    };
    let text = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config: NodeConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
    info!("Config: loaded from {}", path);
    Ok(config)
}

fn main() -> Result<()> {
    logging::init();

    info!("╔══════════════════════════════════════╗");
    info!("║  SLS node v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config()?;
    config
        .validate()
        .map_err(sls_node::Error::from)
        .context("invalid configuration")?;
    info!(
        "Config: PAN 0x{:04X}, encryption {:?}, gateway {}",
        config.pan_id, config.encryption_mode, config.gateway_addr
    );

    runtime::run(config, SimulatedHardware::new()).context("node runtime")?;
    Ok(())
}
