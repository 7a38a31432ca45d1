//! Snapshot and event structures shared between the simulation core and
//! its presentation layers.
//!
//! The core never hands out references to its own mutable state. Instead it
//! publishes [`MinerEvent`]s on every state change and folds them into an
//! immutable [`SimulationSnapshot`] that renderers can poll.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{FinishReason, MinerState};
use crate::ids::MinerId;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A single state change of one miner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerEvent {
    /// The miner that changed state.
    pub miner: MinerId,
    /// What happened.
    pub kind: MinerEventKind,
}

/// The payload of a [`MinerEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MinerEventKind {
    /// The miner took a batch from the deposit and started mining it.
    Extracting {
        /// Units taken from the deposit.
        amount: u64,
        /// Units left in the deposit right after the decrement.
        remaining: u64,
    },
    /// The batch has been mined and loaded onto the vehicle.
    Extracted {
        /// Units mined.
        amount: u64,
        /// Units left in the deposit when mining finished (may be stale).
        remaining: u64,
    },
    /// The miner left for the warehouse.
    Transporting {
        /// Units on the vehicle.
        carrying: u64,
    },
    /// The miner entered the warehouse gate and started unloading.
    Depositing {
        /// Units being unloaded.
        carrying: u64,
    },
    /// The batch is in the warehouse.
    Deposited {
        /// Units unloaded.
        amount: u64,
        /// Warehouse stock after the increment.
        stored: u64,
        /// Total transferred after the increment.
        total_transferred: u64,
    },
    /// The miner stopped for good.
    Finished {
        /// Why the miner stopped.
        reason: FinishReason,
    },
}

impl MinerEventKind {
    /// The state the miner is in after this event.
    pub const fn resulting_state(self) -> MinerState {
        match self {
            Self::Extracting { .. } | Self::Extracted { .. } => MinerState::Extracting,
            Self::Transporting { .. } => MinerState::Transporting,
            Self::Depositing { .. } => MinerState::Depositing,
            Self::Deposited { .. } => MinerState::Idle,
            Self::Finished { .. } => MinerState::Finished,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only view of one miner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerStatus {
    /// Current phase.
    pub state: MinerState,
    /// Units on the vehicle (0 unless between extraction and deposit).
    pub carrying: u64,
    /// Completed deposit trips.
    pub trips: u32,
    /// Why the miner stopped, once it has.
    pub finish_reason: Option<FinishReason>,
}

/// Immutable view of the whole simulation at one instant.
///
/// Counters are folded from events and may lag the live values by the
/// events still in flight; they never move backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// The deposit size the run started with.
    pub initial_amount: u64,
    /// Units left in the deposit.
    pub remaining: u64,
    /// Units held by the warehouse.
    pub stored: u64,
    /// Units transferred into the warehouse so far.
    pub total_transferred: u64,
    /// Per-miner status keyed by miner identifier.
    pub miners: BTreeMap<MinerId, MinerStatus>,
    /// Set once every miner has finished.
    pub complete: bool,
    /// When this snapshot was last updated.
    pub taken_at: DateTime<Utc>,
}

impl SimulationSnapshot {
    /// Snapshot of a run that has not started: full deposit, empty
    /// warehouse, every miner idle.
    pub fn initial(initial_amount: u64, miner_count: u32) -> Self {
        Self {
            initial_amount,
            remaining: initial_amount,
            stored: 0,
            total_transferred: 0,
            miners: MinerId::crew(miner_count)
                .map(|id| (id, MinerStatus::default()))
                .collect(),
            complete: false,
            taken_at: Utc::now(),
        }
    }

    /// Fold one event into the snapshot.
    ///
    /// Events from different miners can arrive out of order relative to the
    /// counters they carry, so `remaining` only ever moves down and the
    /// warehouse counters only ever move up.
    pub fn apply(&mut self, event: &MinerEvent) {
        let status = self.miners.entry(event.miner).or_default();
        status.state = event.kind.resulting_state();

        match event.kind {
            MinerEventKind::Extracting { amount, remaining }
            | MinerEventKind::Extracted { amount, remaining } => {
                status.carrying = amount;
                self.remaining = self.remaining.min(remaining);
            }
            MinerEventKind::Transporting { carrying } | MinerEventKind::Depositing { carrying } => {
                status.carrying = carrying;
            }
            MinerEventKind::Deposited {
                stored,
                total_transferred,
                ..
            } => {
                status.carrying = 0;
                status.trips = status.trips.saturating_add(1);
                self.stored = self.stored.max(stored);
                self.total_transferred = self.total_transferred.max(total_transferred);
            }
            MinerEventKind::Finished { reason } => {
                status.carrying = 0;
                status.finish_reason = Some(reason);
            }
        }

        self.taken_at = Utc::now();
    }

    /// Sum of the amounts currently on vehicles.
    pub fn in_flight(&self) -> u64 {
        self.miners
            .values()
            .fold(0_u64, |acc, status| acc.saturating_add(status.carrying))
    }

    /// Number of miners in the given state.
    pub fn count_in(&self, state: MinerState) -> usize {
        self.miners.values().filter(|s| s.state == state).count()
    }

    /// Returns `true` if every miner has finished.
    pub fn all_finished(&self) -> bool {
        self.miners.values().all(|s| s.state.is_terminal())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event(miner: u32, kind: MinerEventKind) -> MinerEvent {
        MinerEvent {
            miner: MinerId(miner),
            kind,
        }
    }

    #[test]
    fn initial_snapshot_has_idle_crew() {
        let snap = SimulationSnapshot::initial(2000, 3);
        assert_eq!(snap.remaining, 2000);
        assert_eq!(snap.miners.len(), 3);
        assert_eq!(snap.count_in(MinerState::Idle), 3);
        assert!(!snap.all_finished());
    }

    #[test]
    fn full_cycle_updates_counters() {
        let mut snap = SimulationSnapshot::initial(500, 1);
        snap.apply(&event(
            1,
            MinerEventKind::Extracting {
                amount: 200,
                remaining: 300,
            },
        ));
        assert_eq!(snap.remaining, 300);
        assert_eq!(snap.in_flight(), 200);

        snap.apply(&event(1, MinerEventKind::Transporting { carrying: 200 }));
        snap.apply(&event(1, MinerEventKind::Depositing { carrying: 200 }));
        assert_eq!(snap.count_in(MinerState::Depositing), 1);

        snap.apply(&event(
            1,
            MinerEventKind::Deposited {
                amount: 200,
                stored: 200,
                total_transferred: 200,
            },
        ));
        let status = snap.miners.get(&MinerId(1)).copied().unwrap();
        assert_eq!(status.state, MinerState::Idle);
        assert_eq!(status.carrying, 0);
        assert_eq!(status.trips, 1);
        assert_eq!(snap.stored, 200);
        assert_eq!(snap.remaining + snap.in_flight() + snap.stored, 500);
    }

    #[test]
    fn stale_counters_never_move_backwards() {
        let mut snap = SimulationSnapshot::initial(1000, 2);
        snap.apply(&event(
            2,
            MinerEventKind::Extracting {
                amount: 200,
                remaining: 600,
            },
        ));
        // Miner 1 decremented first but its event arrives late.
        snap.apply(&event(
            1,
            MinerEventKind::Extracting {
                amount: 200,
                remaining: 800,
            },
        ));
        assert_eq!(snap.remaining, 600);

        snap.apply(&event(
            2,
            MinerEventKind::Deposited {
                amount: 200,
                stored: 400,
                total_transferred: 400,
            },
        ));
        snap.apply(&event(
            1,
            MinerEventKind::Deposited {
                amount: 200,
                stored: 200,
                total_transferred: 200,
            },
        ));
        assert_eq!(snap.stored, 400);
        assert_eq!(snap.total_transferred, 400);
    }

    #[test]
    fn finished_records_reason() {
        let mut snap = SimulationSnapshot::initial(0, 1);
        snap.apply(&event(
            1,
            MinerEventKind::Finished {
                reason: FinishReason::DepositExhausted,
            },
        ));
        assert!(snap.all_finished());
        let status = snap.miners.get(&MinerId(1)).copied().unwrap();
        assert_eq!(status.finish_reason, Some(FinishReason::DepositExhausted));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(event(3, MinerEventKind::Transporting { carrying: 50 }))
            .unwrap();
        assert_eq!(json["miner"], 3);
        assert_eq!(json["kind"]["type"], "transporting");
        assert_eq!(json["kind"]["carrying"], 50);
    }
}
