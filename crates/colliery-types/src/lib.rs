//! Shared type definitions for the Colliery simulation.
//!
//! This crate holds the types that cross the boundary between the
//! coordination core and anything that presents its progress: miner
//! identifiers, miner states, state-change events and snapshots.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe miner identifier
//! - [`enums`] -- Miner states and finish reasons
//! - [`structs`] -- Events and snapshots published by the core

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{FinishReason, MinerState};
pub use ids::MinerId;
pub use structs::{MinerEvent, MinerEventKind, MinerStatus, SimulationSnapshot};
