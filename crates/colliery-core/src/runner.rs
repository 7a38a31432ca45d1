//! Simulation controller.
//!
//! This module provides [`Simulation`], which builds a fresh [`Mine`],
//! spawns one task per miner, waits for every miner to finish and returns
//! the final counters together with the wall-clock duration of the run.
//!
//! Elapsed time is measured with the tokio clock, so a test running on a
//! paused clock observes simulated time exactly.

use std::sync::Arc;
use std::time::Duration;

use colliery_types::{MinerId, SimulationSnapshot};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::board::StatusBoard;
use crate::config::{ConfigError, SimulationConfig};
use crate::conservation::{
    verify_conservation, ConservationAnomaly, ConservationResult, QuiescentTotals,
};
use crate::gate::GateError;
use crate::mine::Mine;
use crate::miner::{Miner, MinerError, MinerReport};

/// Errors that can occur during a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A run needs at least one miner.
    #[error("a simulation needs at least one miner")]
    NoMiners,

    /// The configuration cannot drive a terminating run.
    #[error("invalid configuration: {source}")]
    Config {
        /// The underlying validation error.
        #[from]
        source: ConfigError,
    },

    /// The mine could not be built.
    #[error("mine setup failed: {source}")]
    Setup {
        /// The underlying gate error.
        #[from]
        source: GateError,
    },

    /// A miner stopped with an error.
    #[error("miner failed: {source}")]
    Miner {
        /// The underlying miner error.
        #[from]
        source: MinerError,
    },

    /// A miner task panicked or was cancelled.
    #[error("miner task did not complete: {source}")]
    MinerTask {
        /// The underlying join error.
        #[from]
        source: JoinError,
    },

    /// The final counters do not add up.
    #[error("conservation check failed: {source}")]
    Conservation {
        /// The detected anomaly.
        #[from]
        source: ConservationAnomaly,
    },
}

/// Highest simultaneous gate occupancy observed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateUsage {
    /// Peak number of miners inside the extraction gate.
    pub extraction_peak: usize,
    /// Configured extraction gate capacity.
    pub extraction_capacity: usize,
    /// Peak number of miners inside the warehouse gate.
    pub warehouse_peak: usize,
    /// Configured warehouse gate capacity.
    pub warehouse_capacity: usize,
}

/// Result of a completed simulation run.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// Number of miners that worked the deposit.
    pub miners: u32,
    /// Deposit size at the start of the run.
    pub initial_amount: u64,
    /// Units left in the deposit.
    pub final_remaining: u64,
    /// Units in the warehouse.
    pub final_stored: u64,
    /// Units transferred into the warehouse.
    pub total_transferred: u64,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
    /// Per-miner reports ordered by miner identifier.
    pub reports: Vec<MinerReport>,
    /// Gate occupancy instrumentation.
    pub gate_usage: GateUsage,
    /// Final published snapshot.
    pub snapshot: SimulationSnapshot,
}

impl SimulationOutcome {
    /// Total deposit trips across all miners.
    pub fn total_trips(&self) -> u32 {
        self.reports
            .iter()
            .fold(0_u32, |acc, report| acc.saturating_add(report.trips))
    }
}

/// One simulation run over a fresh mine.
#[derive(Debug)]
pub struct Simulation {
    mine: Arc<Mine>,
    miners: u32,
}

impl Simulation {
    /// Prepare a run of `miners` miners. Subscribe to [`Simulation::board`]
    /// before calling [`Simulation::run`] to observe every event.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::NoMiners`] if `miners` is 0,
    /// [`RunnerError::Config`] if the configuration fails validation, or
    /// [`RunnerError::Setup`] if a gate cannot be built.
    pub fn new(config: &SimulationConfig, miners: u32) -> Result<Self, RunnerError> {
        if miners == 0 {
            return Err(RunnerError::NoMiners);
        }
        config.validate()?;
        let mine = Mine::new(config, miners)?;
        Ok(Self {
            mine: Arc::new(mine),
            miners,
        })
    }

    /// The status board of this run.
    pub fn board(&self) -> &StatusBoard {
        &self.mine.board
    }

    /// The shared mine, for instrumentation.
    pub fn mine(&self) -> &Mine {
        &self.mine
    }

    /// Number of miners in this run.
    pub const fn miners(&self) -> u32 {
        self.miners
    }

    /// Spawn the crew and wait until every miner has finished.
    ///
    /// If a miner fails, both gates are closed so the rest of the crew stops
    /// promptly, and the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Miner`] or [`RunnerError::MinerTask`] if a
    /// miner does not finish normally, or [`RunnerError::Conservation`] if
    /// the final counters do not balance.
    pub async fn run(self) -> Result<SimulationOutcome, RunnerError> {
        info!(
            miners = self.miners,
            initial_amount = self.mine.initial_amount(),
            vehicle_capacity = self.mine.plan.vehicle_capacity,
            extraction_limit = self.mine.deposit.gate().capacity(),
            deposit_limit = self.mine.warehouse.gate().capacity(),
            "Simulation starting"
        );

        let start = Instant::now();
        let mut crew = JoinSet::new();
        for id in MinerId::crew(self.miners) {
            crew.spawn(Miner::new(id, Arc::clone(&self.mine)).run());
        }

        let mut reports = Vec::new();
        let mut failure: Option<RunnerError> = None;
        while let Some(joined) = crew.join_next().await {
            let outcome = match joined {
                Ok(Ok(report)) => {
                    reports.push(report);
                    continue;
                }
                Ok(Err(source)) => RunnerError::from(source),
                Err(source) => RunnerError::from(source),
            };
            warn!(error = %outcome, "miner did not finish normally");
            if failure.is_none() {
                self.mine.shut_down();
                failure = Some(outcome);
            }
        }
        let elapsed = start.elapsed();

        if let Some(err) = failure {
            return Err(err);
        }

        reports.sort_by_key(|report| report.id);
        self.mine.board.complete();

        let totals = QuiescentTotals {
            initial_amount: self.mine.initial_amount(),
            remaining: self.mine.deposit.remaining(),
            stored: self.mine.warehouse.stored(),
            total_transferred: self.mine.warehouse.total_transferred(),
        };
        if let ConservationResult::Anomaly(anomaly) = verify_conservation(totals) {
            error!(
                initial_amount = totals.initial_amount,
                remaining = totals.remaining,
                stored = totals.stored,
                total_transferred = totals.total_transferred,
                "{}",
                anomaly.message
            );
            return Err(anomaly.into());
        }

        let gate_usage = GateUsage {
            extraction_peak: self.mine.deposit.gate().peak_holders(),
            extraction_capacity: self.mine.deposit.gate().capacity(),
            warehouse_peak: self.mine.warehouse.gate().peak_holders(),
            warehouse_capacity: self.mine.warehouse.gate().capacity(),
        };

        Ok(SimulationOutcome {
            miners: self.miners,
            initial_amount: totals.initial_amount,
            final_remaining: totals.remaining,
            final_stored: totals.stored,
            total_transferred: totals.total_transferred,
            elapsed,
            reports,
            gate_usage,
            snapshot: self.mine.board.snapshot(),
        })
    }
}

/// Run one simulation of `miners` miners over a fresh mine.
///
/// # Errors
///
/// See [`Simulation::new`] and [`Simulation::run`].
pub async fn run_simulation(
    config: &SimulationConfig,
    miners: u32,
) -> Result<SimulationOutcome, RunnerError> {
    Simulation::new(config, miners)?.run().await
}

/// Log the end-of-run summary.
pub fn log_simulation_end(outcome: &SimulationOutcome) {
    info!(
        miners = outcome.miners,
        total_transferred = outcome.total_transferred,
        deposit_remaining = outcome.final_remaining,
        warehouse_stored = outcome.final_stored,
        trips = outcome.total_trips(),
        elapsed_secs = outcome.elapsed.as_secs_f64(),
        "Simulation finished"
    );

    for report in &outcome.reports {
        info!(
            miner = %report.id,
            trips = report.trips,
            mined = report.mined,
            reason = ?report.finish_reason,
            "Miner summary"
        );
    }
}
