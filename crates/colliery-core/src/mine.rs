//! The shared simulation context.
//!
//! A [`Mine`] bundles everything miners share during one run: the deposit,
//! the warehouse, the trip parameters and the status board. It is built once
//! per run and handed to every miner behind an [`Arc`](std::sync::Arc), so
//! runs never share state with each other.

use std::time::Duration;

use crate::board::StatusBoard;
use crate::config::SimulationConfig;
use crate::deposit::Deposit;
use crate::gate::GateError;
use crate::warehouse::Warehouse;

/// Per-trip parameters common to every miner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripPlan {
    /// Maximum units taken per extraction.
    pub vehicle_capacity: u64,
    /// Fixed time from the deposit to the warehouse.
    pub travel_time: Duration,
}

/// Shared state for one simulation run.
#[derive(Debug)]
pub struct Mine {
    /// The depleting resource.
    pub deposit: Deposit,
    /// The accumulator.
    pub warehouse: Warehouse,
    /// Trip parameters.
    pub plan: TripPlan,
    /// Publication of miner events and snapshots.
    pub board: StatusBoard,
    initial_amount: u64,
}

impl Mine {
    /// Build the context for a run with `miner_count` miners.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ZeroCapacity`] if either gate limit is 0.
    pub fn new(config: &SimulationConfig, miner_count: u32) -> Result<Self, GateError> {
        let initial_amount = config.deposit.initial_amount;
        Ok(Self {
            deposit: Deposit::new(
                initial_amount,
                config.deposit.extraction_limit,
                config.deposit.mining_time_per_unit(),
            )?,
            warehouse: Warehouse::new(
                config.warehouse.deposit_limit,
                config.warehouse.unload_time_per_unit(),
            )?,
            plan: TripPlan {
                vehicle_capacity: config.miners.vehicle_capacity,
                travel_time: config.miners.travel_time(),
            },
            board: StatusBoard::new(initial_amount, miner_count),
            initial_amount,
        })
    }

    /// The deposit size the run started with.
    pub const fn initial_amount(&self) -> u64 {
        self.initial_amount
    }

    /// Returns `true` once the warehouse has received the whole initial
    /// deposit, judged from an unsynchronized read of the transfer total.
    pub fn transfer_complete(&self) -> bool {
        self.warehouse.total_transferred() >= self.initial_amount
    }

    /// Close both gates. Miners waiting on a gate fail with
    /// [`GateError::Closed`].
    pub fn shut_down(&self) {
        self.deposit.gate().close();
        self.warehouse.gate().close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_default_config() {
        let mine = Mine::new(&SimulationConfig::default(), 5).unwrap();
        assert_eq!(mine.initial_amount(), 2000);
        assert_eq!(mine.deposit.remaining(), 2000);
        assert_eq!(mine.deposit.gate().capacity(), 2);
        assert_eq!(mine.warehouse.gate().capacity(), 1);
        assert_eq!(mine.plan.vehicle_capacity, 200);
        assert_eq!(mine.board.snapshot().miners.len(), 5);
        assert!(!mine.transfer_complete());
    }

    #[test]
    fn empty_deposit_counts_as_transferred() {
        let mut config = SimulationConfig::default();
        config.deposit.initial_amount = 0;
        let mine = Mine::new(&config, 1).unwrap();
        assert!(mine.transfer_complete());
    }

    #[test]
    fn zero_gate_limit_is_rejected() {
        let mut config = SimulationConfig::default();
        config.warehouse.deposit_limit = 0;
        assert!(matches!(
            Mine::new(&config, 1),
            Err(GateError::ZeroCapacity { .. })
        ));
    }

    #[tokio::test]
    async fn shut_down_closes_gates() {
        let mine = Mine::new(&SimulationConfig::default(), 1).unwrap();
        mine.shut_down();
        assert!(mine.deposit.extract(10).await.is_err());
        assert!(mine.warehouse.deposit(10).await.is_err());
    }
}
