//! A single miner's lifecycle.
//!
//! Each miner runs as its own task and loops through the extraction cycle
//! until it finishes:
//!
//! 1. **Extract** -- enter the extraction gate and take up to a vehicle
//!    load. An empty take means the deposit is exhausted and the miner
//!    finishes.
//! 2. **Mine** -- spend `amount * mining time per unit`, still inside the
//!    extraction gate.
//! 3. **Transport** -- spend the fixed travel time.
//! 4. **Deposit** -- enter the warehouse gate, spend
//!    `amount * unload time per unit`, record the batch.
//! 5. **Check** -- if the warehouse already holds the whole initial deposit,
//!    finish; otherwise start over.
//!
//! The step-5 check reads the transfer total without coordinating with
//! other miners. Several miners may see the threshold crossed at once, and a
//! miner that reads a stale total simply makes one more extraction attempt,
//! which comes back empty. Neither case can move more coal than was mined.

use std::sync::Arc;

use colliery_types::{FinishReason, MinerEvent, MinerEventKind, MinerId, MinerState};
use tracing::{debug, info};

use crate::gate::GateError;
use crate::mine::Mine;

/// Errors that can stop a miner before it finishes normally.
#[derive(Debug, thiserror::Error)]
pub enum MinerError {
    /// A gate was closed while the miner needed it.
    #[error("miner {miner}: {source}")]
    Gate {
        /// The affected miner.
        miner: MinerId,
        /// The underlying gate error.
        source: GateError,
    },
}

/// What a miner did during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinerReport {
    /// The miner.
    pub id: MinerId,
    /// Completed extract-transport-deposit cycles.
    pub trips: u32,
    /// Units this miner moved into the warehouse.
    pub mined: u64,
    /// Why the miner stopped.
    pub finish_reason: FinishReason,
}

/// One worker agent.
#[derive(Debug)]
pub struct Miner {
    id: MinerId,
    state: MinerState,
    carrying: u64,
    trips: u32,
    mined: u64,
    mine: Arc<Mine>,
}

impl Miner {
    /// Create an idle miner working `mine`.
    pub const fn new(id: MinerId, mine: Arc<Mine>) -> Self {
        Self {
            id,
            state: MinerState::Idle,
            carrying: 0,
            trips: 0,
            mined: 0,
            mine,
        }
    }

    /// The miner's identifier.
    pub const fn id(&self) -> MinerId {
        self.id
    }

    /// Current phase.
    pub const fn state(&self) -> MinerState {
        self.state
    }

    /// Units currently on the vehicle.
    pub const fn carrying(&self) -> u64 {
        self.carrying
    }

    /// Work until the deposit is exhausted or fully transferred.
    ///
    /// # Errors
    ///
    /// Returns [`MinerError::Gate`] if a gate is closed underneath the miner.
    pub async fn run(mut self) -> Result<MinerReport, MinerError> {
        debug!(miner = %self.id, "miner starting");
        loop {
            if let Some(reason) = self.cycle().await? {
                return Ok(self.finish(reason));
            }
        }
    }

    /// Run one extraction cycle. Returns `Some` when the miner is done.
    async fn cycle(&mut self) -> Result<Option<FinishReason>, MinerError> {
        let mine = Arc::clone(&self.mine);
        let capacity = mine.plan.vehicle_capacity;

        // Idle -> Extracting
        let extraction = mine
            .deposit
            .begin_extraction(capacity)
            .await
            .map_err(|source| self.gate_error(source))?;

        if extraction.is_empty() {
            return Ok(Some(FinishReason::DepositExhausted));
        }

        let amount = extraction.amount();
        self.transition(
            MinerState::Extracting,
            MinerEventKind::Extracting {
                amount,
                remaining: extraction.remaining(),
            },
        );
        self.carrying = extraction.finish().await;
        self.publish(MinerEventKind::Extracted {
            amount,
            remaining: mine.deposit.remaining(),
        });

        // Extracting -> Transporting
        self.transition(
            MinerState::Transporting,
            MinerEventKind::Transporting {
                carrying: self.carrying,
            },
        );
        tokio::time::sleep(mine.plan.travel_time).await;

        // Transporting -> Depositing
        let unload = mine
            .warehouse
            .begin_unload(self.carrying)
            .await
            .map_err(|source| self.gate_error(source))?;
        self.transition(
            MinerState::Depositing,
            MinerEventKind::Depositing {
                carrying: self.carrying,
            },
        );
        let totals = unload.finish().await;

        self.trips = self.trips.saturating_add(1);
        self.mined = self.mined.saturating_add(self.carrying);
        let delivered = core::mem::take(&mut self.carrying);
        self.transition(
            MinerState::Idle,
            MinerEventKind::Deposited {
                amount: delivered,
                stored: totals.stored,
                total_transferred: totals.total_transferred,
            },
        );

        // Unsynchronized read; other miners may be mid-increment.
        if mine.transfer_complete() {
            info!(
                miner = %self.id,
                total_transferred = mine.warehouse.total_transferred(),
                "miner noticed every unit transferred"
            );
            return Ok(Some(FinishReason::TransferComplete));
        }

        Ok(None)
    }

    fn finish(mut self, reason: FinishReason) -> MinerReport {
        self.transition(MinerState::Finished, MinerEventKind::Finished { reason });
        debug!(
            miner = %self.id,
            trips = self.trips,
            mined = self.mined,
            reason = ?reason,
            "miner finished"
        );
        MinerReport {
            id: self.id,
            trips: self.trips,
            mined: self.mined,
            finish_reason: reason,
        }
    }

    fn transition(&mut self, state: MinerState, kind: MinerEventKind) {
        self.state = state;
        self.publish(kind);
    }

    fn publish(&self, kind: MinerEventKind) {
        self.mine.board.publish(MinerEvent {
            miner: self.id,
            kind,
        });
    }

    const fn gate_error(&self, source: GateError) -> MinerError {
        MinerError::Gate {
            miner: self.id,
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::config::SimulationConfig;

    fn config(initial: u64, capacity: u64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.deposit.initial_amount = initial;
        config.miners.vehicle_capacity = capacity;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn lone_miner_empties_deposit() {
        let mine = Arc::new(Mine::new(&config(2000, 300), 1).unwrap());
        let report = Miner::new(MinerId(1), Arc::clone(&mine)).run().await.unwrap();

        // 6 x 300 + 1 x 200
        assert_eq!(report.trips, 7);
        assert_eq!(report.mined, 2000);
        assert_eq!(report.finish_reason, FinishReason::TransferComplete);
        assert_eq!(mine.deposit.remaining(), 0);
        assert_eq!(mine.warehouse.stored(), 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_timing_matches_phases() {
        // 100 units: 1 s mining, 10 s travel, 1 s unloading.
        let mine = Arc::new(Mine::new(&config(100, 200), 1).unwrap());
        let start = Instant::now();
        let report = Miner::new(MinerId(1), mine).run().await.unwrap();
        assert_eq!(report.trips, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_deposit_finishes_immediately() {
        let mine = Arc::new(Mine::new(&config(0, 200), 1).unwrap());
        let start = Instant::now();
        let report = Miner::new(MinerId(1), mine).run().await.unwrap();
        assert_eq!(report.trips, 0);
        assert_eq!(report.mined, 0);
        assert_eq!(report.finish_reason, FinishReason::DepositExhausted);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_every_transition_in_order() {
        let mine = Arc::new(Mine::new(&config(150, 200), 1).unwrap());
        let mut rx = mine.board.subscribe();
        Miner::new(MinerId(1), Arc::clone(&mine)).run().await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.miner, MinerId(1));
            kinds.push(event.kind);
        }
        assert_eq!(kinds, vec![
            MinerEventKind::Extracting {
                amount: 150,
                remaining: 0,
            },
            MinerEventKind::Extracted {
                amount: 150,
                remaining: 0,
            },
            MinerEventKind::Transporting { carrying: 150 },
            MinerEventKind::Depositing { carrying: 150 },
            MinerEventKind::Deposited {
                amount: 150,
                stored: 150,
                total_transferred: 150,
            },
            MinerEventKind::Finished {
                reason: FinishReason::TransferComplete,
            },
        ]);

        let snap = mine.board.snapshot();
        let status = snap.miners.get(&MinerId(1)).copied().unwrap();
        assert_eq!(status.state, MinerState::Finished);
        assert_eq!(status.trips, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_gate_surfaces_as_error() {
        let mine = Arc::new(Mine::new(&config(1000, 200), 1).unwrap());
        mine.shut_down();
        let result = Miner::new(MinerId(4), mine).run().await;
        assert!(matches!(
            result,
            Err(MinerError::Gate {
                miner: MinerId(4),
                ..
            })
        ));
    }

    #[test]
    fn new_miner_is_idle_and_empty() {
        let mine = Arc::new(Mine::new(&SimulationConfig::default(), 1).unwrap());
        let miner = Miner::new(MinerId(2), mine);
        assert_eq!(miner.id(), MinerId(2));
        assert_eq!(miner.state(), MinerState::Idle);
        assert_eq!(miner.carrying(), 0);
    }
}
