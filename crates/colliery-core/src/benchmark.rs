//! Scaling benchmark over crew sizes.
//!
//! [`sweep`] runs the simulation once for every crew size `1..=max_miners`,
//! one run after another so runs never compete for the runtime, and derives
//! speedup and efficiency relative to the single-miner run:
//!
//! ```text
//! speedup(n)    = elapsed(1) / elapsed(n)
//! efficiency(n) = speedup(n) / n
//! ```
//!
//! The fixed travel time dominates short runs, so neither figure is expected
//! to be monotonic in `n`.

use std::time::Duration;

use tracing::info;

use crate::config::SimulationConfig;
use crate::runner::{run_simulation, RunnerError};

/// Measurements for one crew size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkRow {
    /// Crew size.
    pub miners: u32,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Single-miner duration divided by this run's duration.
    pub speedup: f64,
    /// Speedup divided by crew size.
    pub efficiency: f64,
}

impl BenchmarkRow {
    /// Duration of the run in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Results of a full sweep, one row per crew size in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkReport {
    /// Rows for crew sizes `1..=max_miners`.
    pub rows: Vec<BenchmarkRow>,
}

impl BenchmarkReport {
    /// The row for the given crew size, if it was measured.
    pub fn row(&self, miners: u32) -> Option<&BenchmarkRow> {
        self.rows.iter().find(|row| row.miners == miners)
    }

    /// The row with the shortest run, if any.
    pub fn fastest(&self) -> Option<&BenchmarkRow> {
        self.rows.iter().min_by_key(|row| row.elapsed)
    }
}

/// Speedup of a run relative to the single-miner baseline.
///
/// A zero-length run (an empty deposit) has nothing to speed up, so any
/// comparison involving one is reported as 1.0.
pub fn speedup(baseline: Duration, elapsed: Duration) -> f64 {
    if baseline.is_zero() || elapsed.is_zero() {
        return 1.0;
    }
    baseline.as_secs_f64() / elapsed.as_secs_f64()
}

/// Efficiency of a run: its speedup divided by the crew size.
pub fn efficiency(speedup: f64, miners: u32) -> f64 {
    if miners == 0 {
        return 0.0;
    }
    speedup / f64::from(miners)
}

/// Run the simulation for crew sizes `1..=max_miners`, sequentially, each
/// over a fresh mine.
///
/// # Errors
///
/// Returns [`RunnerError::NoMiners`] if `max_miners` is 0, or the first
/// error of any run.
pub async fn sweep(
    max_miners: u32,
    config: &SimulationConfig,
) -> Result<BenchmarkReport, RunnerError> {
    if max_miners == 0 {
        return Err(RunnerError::NoMiners);
    }

    let mut timings: Vec<(u32, Duration)> = Vec::new();
    for miners in 1..=max_miners {
        info!(miners, "Starting benchmark run");
        let outcome = run_simulation(config, miners).await?;
        info!(
            miners,
            elapsed_secs = outcome.elapsed.as_secs_f64(),
            trips = outcome.total_trips(),
            "Benchmark run finished"
        );
        timings.push((miners, outcome.elapsed));
    }

    let baseline = timings
        .first()
        .map_or(Duration::ZERO, |(_, elapsed)| *elapsed);

    let rows = timings
        .into_iter()
        .map(|(miners, elapsed)| {
            let speedup = speedup(baseline, elapsed);
            BenchmarkRow {
                miners,
                elapsed,
                speedup,
                efficiency: efficiency(speedup, miners),
            }
        })
        .collect();

    Ok(BenchmarkReport { rows })
}
