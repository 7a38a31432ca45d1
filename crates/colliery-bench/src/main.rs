//! Scaling benchmark binary for Colliery.
//!
//! Times the simulation for every crew size from 1 to `MAX_MINERS`, one run
//! after another, and prints elapsed time, speedup and efficiency relative
//! to the single-miner run.
//!
//! # Usage
//!
//! ```text
//! colliery-bench [MAX_MINERS]
//! ```
//!
//! `MAX_MINERS` falls back to `benchmark.max_miners` from the configuration
//! (6 by default) when absent or not a positive integer.

mod table;

use std::path::Path;

use colliery_core::benchmark;
use colliery_core::config::{parse_miner_count, SimulationConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "colliery-config.yaml";

/// Crew-size ceiling used when neither the command line nor the
/// configuration provides a positive one.
const FALLBACK_MAX_MINERS: u32 = 6;

/// Top-level error for the benchmark binary.
#[derive(Debug, thiserror::Error)]
enum BenchError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: colliery_core::config::ConfigError,
    },

    /// A benchmark run failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: colliery_core::runner::RunnerError,
    },
}

/// Application entry point for the benchmark.
///
/// # Errors
///
/// Returns an error if configuration loading or any run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = load_config()?;
    let default_max = if config.benchmark.max_miners > 0 {
        config.benchmark.max_miners
    } else {
        FALLBACK_MAX_MINERS
    };
    let max_miners = parse_miner_count(std::env::args().nth(1).as_deref(), default_max);

    info!(max_miners, "Measuring simulation time for crew sizes 1..={max_miners}");
    let report = benchmark::sweep(max_miners, &config)
        .await
        .map_err(BenchError::from)?;

    if let Some(fastest) = report.fastest() {
        info!(
            miners = fastest.miners,
            elapsed_secs = fastest.elapsed_seconds(),
            speedup = fastest.speedup,
            "Fastest crew"
        );
    }

    println!();
    println!("Results (speedup and efficiency):");
    for line in table::render(&report) {
        println!("{line}");
    }

    Ok(())
}

/// Load the simulation configuration from `colliery-config.yaml`, falling
/// back to defaults when the file is absent.
fn load_config() -> Result<SimulationConfig, BenchError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok(SimulationConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
