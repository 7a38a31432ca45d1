//! Configuration loading and typed config structures for the Colliery simulation.
//!
//! The configuration lives in `colliery-config.yaml` in the working
//! directory. Every field has a default matching the classic scenario
//! (a 2000-unit deposit worked by five miners with 200-unit vehicles), so an
//! absent file or an empty document yields a runnable configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Miner count used when the command line does not provide a usable one.
pub const DEFAULT_MINER_COUNT: u32 = 5;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes a simulation that cannot run.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `colliery-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// The depleting resource and its extraction gate.
    #[serde(default)]
    pub deposit: DepositConfig,

    /// The accumulator and its unloading gate.
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Crew size, vehicle capacity and travel time.
    #[serde(default)]
    pub miners: MinersConfig,

    /// Scaling benchmark parameters.
    #[serde(default)]
    pub benchmark: BenchmarkConfig,

    /// How the engine binary presents progress.
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values cannot drive a simulation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values cannot drive a simulation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a simulation that terminates.
    ///
    /// A zero vehicle capacity would never drain the deposit, and a zero
    /// gate limit would never admit a miner. Phase timings scale with a
    /// `u32` unit count, so a vehicle load may not exceed [`MAX_VEHICLE_CAPACITY`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.miners.vehicle_capacity == 0 {
            return Err(invalid("miners.vehicle_capacity must be at least 1"));
        }
        if self.miners.vehicle_capacity > MAX_VEHICLE_CAPACITY {
            return Err(invalid("miners.vehicle_capacity must not exceed 4294967295"));
        }
        if self.deposit.extraction_limit == 0 {
            return Err(invalid("deposit.extraction_limit must be at least 1"));
        }
        if self.warehouse.deposit_limit == 0 {
            return Err(invalid("warehouse.deposit_limit must be at least 1"));
        }
        Ok(())
    }

    /// Return a copy with the crew size replaced.
    #[must_use]
    pub fn with_miner_count(&self, count: u32) -> Self {
        let mut config = self.clone();
        config.miners.count = count;
        config
    }
}

/// Largest accepted vehicle load, in units (`u32::MAX`).
pub const MAX_VEHICLE_CAPACITY: u64 = 0xFFFF_FFFF;

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Deposit (depleting resource) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepositConfig {
    /// Units of coal in the deposit at the start of a run.
    #[serde(default = "default_initial_amount")]
    pub initial_amount: u64,

    /// Maximum number of miners mining at the same time.
    #[serde(default = "default_extraction_limit")]
    pub extraction_limit: usize,

    /// Milliseconds of mining per unit extracted.
    #[serde(default = "default_time_per_unit_ms")]
    pub mining_time_per_unit_ms: u64,
}

impl DepositConfig {
    /// Mining time per unit as a [`Duration`].
    pub const fn mining_time_per_unit(&self) -> Duration {
        Duration::from_millis(self.mining_time_per_unit_ms)
    }
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            initial_amount: default_initial_amount(),
            extraction_limit: default_extraction_limit(),
            mining_time_per_unit_ms: default_time_per_unit_ms(),
        }
    }
}

/// Warehouse (accumulator) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WarehouseConfig {
    /// Maximum number of miners unloading at the same time.
    #[serde(default = "default_deposit_limit")]
    pub deposit_limit: usize,

    /// Milliseconds of unloading per unit deposited.
    #[serde(default = "default_time_per_unit_ms")]
    pub unload_time_per_unit_ms: u64,
}

impl WarehouseConfig {
    /// Unload time per unit as a [`Duration`].
    pub const fn unload_time_per_unit(&self) -> Duration {
        Duration::from_millis(self.unload_time_per_unit_ms)
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            deposit_limit: default_deposit_limit(),
            unload_time_per_unit_ms: default_time_per_unit_ms(),
        }
    }
}

/// Miner crew configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MinersConfig {
    /// Number of miners in the crew.
    #[serde(default = "default_miner_count")]
    pub count: u32,

    /// Maximum units a miner takes per trip.
    #[serde(default = "default_vehicle_capacity")]
    pub vehicle_capacity: u64,

    /// Milliseconds spent travelling from the deposit to the warehouse.
    #[serde(default = "default_travel_time_ms")]
    pub travel_time_ms: u64,
}

impl MinersConfig {
    /// Travel time as a [`Duration`].
    pub const fn travel_time(&self) -> Duration {
        Duration::from_millis(self.travel_time_ms)
    }
}

impl Default for MinersConfig {
    fn default() -> Self {
        Self {
            count: default_miner_count(),
            vehicle_capacity: default_vehicle_capacity(),
            travel_time_ms: default_travel_time_ms(),
        }
    }
}

/// Benchmark sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BenchmarkConfig {
    /// Largest crew size in the sweep (runs use `1..=max_miners`).
    #[serde(default = "default_max_miners")]
    pub max_miners: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            max_miners: default_max_miners(),
        }
    }
}

/// How the engine binary renders progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// One log line per miner event.
    #[default]
    Log,
    /// Periodic status view of the whole mine.
    Status,
}

/// Presentation configuration for the engine binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresentationConfig {
    /// Rendering mode.
    #[serde(default)]
    pub mode: PresentationMode,

    /// Milliseconds between status views in [`PresentationMode::Status`].
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            mode: PresentationMode::default(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

/// Interpret the optional miner-count argument from the command line.
///
/// Anything that is not a positive integer falls back to `default`.
pub fn parse_miner_count(arg: Option<&str>, default: u32) -> u32 {
    arg.and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|count| *count > 0)
        .unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_initial_amount() -> u64 {
    2000
}

const fn default_extraction_limit() -> usize {
    2
}

const fn default_deposit_limit() -> usize {
    1
}

const fn default_time_per_unit_ms() -> u64 {
    10
}

const fn default_miner_count() -> u32 {
    DEFAULT_MINER_COUNT
}

const fn default_vehicle_capacity() -> u64 {
    200
}

const fn default_travel_time_ms() -> u64 {
    10_000
}

const fn default_max_miners() -> u32 {
    6
}

const fn default_status_interval_ms() -> u64 {
    300
}
