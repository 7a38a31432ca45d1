//! Simulation binary for Colliery.
//!
//! Runs one crew of miners over the deposit and renders its progress
//! either as a plain event log or as a periodic status view.
//!
//! # Usage
//!
//! ```text
//! colliery-engine [MINERS]
//! ```
//!
//! `MINERS` is the crew size. Anything that is not a positive integer falls
//! back to `miners.count` from the configuration (5 by default).
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `colliery-config.yaml`
//! 3. Resolve the crew size from the command line
//! 4. Build the mine and attach the renderer
//! 5. Run the simulation to completion
//! 6. Log the summary

mod error;
mod event_log;
mod status_view;

use std::path::Path;
use std::time::Duration;

use colliery_core::config::{
    parse_miner_count, PresentationMode, SimulationConfig, DEFAULT_MINER_COUNT,
};
use colliery_core::runner::{self, Simulation};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "colliery-config.yaml";

/// Application entry point for the simulation engine.
///
/// # Errors
///
/// Returns an error if configuration loading or the simulation fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Simulation start");

    // 2. Load configuration.
    let config = load_config()?;

    // 3. Resolve crew size.
    let default_count = if config.miners.count > 0 {
        config.miners.count
    } else {
        DEFAULT_MINER_COUNT
    };
    let miners = parse_miner_count(std::env::args().nth(1).as_deref(), default_count);
    info!(
        miners,
        initial_amount = config.deposit.initial_amount,
        vehicle_capacity = config.miners.vehicle_capacity,
        travel_time_ms = config.miners.travel_time_ms,
        mode = ?config.presentation.mode,
        "Configuration loaded"
    );

    // 4. Build the mine and attach the renderer before any miner moves.
    let simulation = Simulation::new(&config, miners).map_err(EngineError::from)?;
    let renderer = match config.presentation.mode {
        PresentationMode::Log => tokio::spawn(event_log::run(simulation.board().subscribe())),
        PresentationMode::Status => tokio::spawn(status_view::run(
            simulation.board().watch(),
            Duration::from_millis(config.presentation.status_interval_ms),
        )),
    };

    // 5. Run.
    let outcome = simulation.run().await.map_err(EngineError::from)?;
    renderer.await.map_err(|e| EngineError::Renderer {
        message: format!("{e}"),
    })?;

    // 6. Summary.
    runner::log_simulation_end(&outcome);
    info!(
        total_transferred = outcome.total_transferred,
        deposit = outcome.final_remaining,
        warehouse = outcome.final_stored,
        "Simulation finished. Transferred {} in total. Deposit stock: {}. Warehouse stock: {}.",
        outcome.total_transferred,
        outcome.final_remaining,
        outcome.final_stored
    );

    Ok(())
}

/// Load the simulation configuration from `colliery-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
