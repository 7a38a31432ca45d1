//! Type-safe identifier for miners.
//!
//! Miners are numbered from 1 within a single simulation run. The newtype
//! keeps miner numbers from being mixed up with counts or amounts, which are
//! plain integers everywhere else in the simulation.

use serde::{Deserialize, Serialize};

/// Identifier of a miner, unique within one simulation run (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinerId(pub u32);

impl MinerId {
    /// Create an identifier from its 1-based miner number.
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Return the inner miner number.
    pub const fn into_inner(self) -> u32 {
        self.0
    }

    /// Iterate over the identifiers of a crew of `count` miners (`1..=count`).
    pub fn crew(count: u32) -> impl Iterator<Item = Self> {
        (1..=count).map(Self)
    }
}

impl core::fmt::Display for MinerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MinerId {
    fn from(number: u32) -> Self {
        Self(number)
    }
}

impl From<MinerId> for u32 {
    fn from(id: MinerId) -> Self {
        id.0
    }
}
