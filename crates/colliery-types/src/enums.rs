//! Enumeration types for the Colliery simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Miner lifecycle
// ---------------------------------------------------------------------------

/// The phase a miner is currently in.
///
/// A miner cycles `Idle -> Extracting -> Transporting -> Depositing -> Idle`
/// until it reaches [`MinerState::Finished`], which is terminal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MinerState {
    /// Waiting to start the next extraction cycle.
    #[default]
    Idle,
    /// Holding the extraction gate and mining a batch.
    Extracting,
    /// Travelling from the deposit to the warehouse.
    Transporting,
    /// Holding the warehouse gate and unloading.
    Depositing,
    /// Stopped for good.
    Finished,
}

impl MinerState {
    /// Short human-readable description used by status renderers.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Extracting => "mining coal...",
            Self::Transporting => "transporting to the warehouse...",
            Self::Depositing => "unloading coal...",
            Self::Finished => "finished work",
        }
    }

    /// Returns `true` once the miner can no longer change state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl core::fmt::Display for MinerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a miner stopped working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// An extraction attempt returned nothing: the deposit is empty.
    DepositExhausted,
    /// After unloading, the miner saw that the warehouse holds the whole
    /// initial deposit.
    TransferComplete,
}
