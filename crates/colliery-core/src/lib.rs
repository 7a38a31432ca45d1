//! Concurrent coordination engine for the Colliery mining simulation.
//!
//! A crew of miners works a finite coal deposit: each miner repeatedly takes
//! a vehicle load, mines it, hauls it to the warehouse and unloads it, until
//! the deposit is empty or the warehouse holds everything. Two independent
//! concurrency gates bound how many miners mine at once and how many unload
//! at once.
//!
//! # Modules
//!
//! - [`gate`] -- Counting concurrency gate with occupancy instrumentation.
//! - [`deposit`] -- The depleting deposit behind the extraction gate.
//! - [`warehouse`] -- The accumulator behind the warehouse gate.
//! - [`mine`] -- The per-run context shared by all miners.
//! - [`miner`] -- A single miner's state machine.
//! - [`board`] -- Event and snapshot publication for renderers.
//! - [`conservation`] -- End-of-run conservation law check.
//! - [`runner`] -- [`Simulation`]: spawn the crew, await it, report totals.
//! - [`benchmark`] -- Sequential sweep over crew sizes with speedup figures.
//! - [`config`] -- Configuration loading from `colliery-config.yaml`.
//!
//! [`Simulation`]: runner::Simulation

pub mod benchmark;
pub mod board;
pub mod config;
pub mod conservation;
pub mod deposit;
pub mod gate;
pub mod mine;
pub mod miner;
pub mod runner;
pub mod warehouse;
