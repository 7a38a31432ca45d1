//! The warehouse that receives every mined batch.
//!
//! Unloading happens behind the warehouse [`Gate`], whose cap is independent
//! of the extraction gate (1 by default, which makes unloading fully
//! exclusive). The stock and the transfer total are incremented together
//! under a mutex while the gate is held.
//!
//! [`Warehouse::total_transferred`] is a lock-free read. Miners use it for
//! their termination check without coordinating with other miners'
//! increments; a stale read only delays a miner's exit by one empty
//! extraction attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::deposit::scaled;
use crate::gate::{Gate, GateError, GatePermit};

/// Name of the warehouse gate in logs and errors.
pub const WAREHOUSE_GATE: &str = "warehouse";

/// Warehouse counters after an unload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarehouseTotals {
    /// Units in stock.
    pub stored: u64,
    /// Units ever transferred in. Always equal to `stored`.
    pub total_transferred: u64,
}

/// The shared accumulator miners unload into.
#[derive(Debug)]
pub struct Warehouse {
    /// Caps simultaneous unloads.
    gate: Gate,

    /// Authoritative counters; mutated only while holding `gate`.
    totals: Mutex<WarehouseTotals>,

    /// Lock-free copy of `totals.stored`.
    stored_view: AtomicU64,

    /// Lock-free copy of `totals.total_transferred`.
    transferred_view: AtomicU64,

    /// Unloading time per unit.
    time_per_unit: Duration,
}

impl Warehouse {
    /// Create an empty warehouse.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ZeroCapacity`] if `deposit_limit` is 0.
    pub fn new(deposit_limit: usize, time_per_unit: Duration) -> Result<Self, GateError> {
        Ok(Self {
            gate: Gate::new(WAREHOUSE_GATE, deposit_limit)?,
            totals: Mutex::new(WarehouseTotals::default()),
            stored_view: AtomicU64::new(0),
            transferred_view: AtomicU64::new(0),
            time_per_unit,
        })
    }

    /// Wait for the warehouse gate and start unloading `amount` units.
    ///
    /// The returned [`Unload`] keeps the gate held; call [`Unload::finish`]
    /// to spend the unloading time and record the batch.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the warehouse gate was closed.
    pub async fn begin_unload(&self, amount: u64) -> Result<Unload<'_>, GateError> {
        let permit = self.gate.acquire().await?;
        Ok(Unload {
            warehouse: self,
            amount,
            _permit: permit,
        })
    }

    /// Unload `amount` units: wait for the gate, spend the unloading time,
    /// record the batch and release the gate.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the warehouse gate was closed.
    pub async fn deposit(&self, amount: u64) -> Result<WarehouseTotals, GateError> {
        let unload = self.begin_unload(amount).await?;
        Ok(unload.finish().await)
    }

    /// Units in stock as last published.
    pub fn stored(&self) -> u64 {
        self.stored_view.load(Ordering::Acquire)
    }

    /// Units transferred so far as last published. Read without
    /// synchronizing with in-progress unloads.
    pub fn total_transferred(&self) -> u64 {
        self.transferred_view.load(Ordering::Acquire)
    }

    /// The warehouse gate, for instrumentation.
    pub const fn gate(&self) -> &Gate {
        &self.gate
    }

    async fn record(&self, amount: u64) -> WarehouseTotals {
        let mut totals = self.totals.lock().await;
        totals.stored = totals.stored.saturating_add(amount);
        totals.total_transferred = totals.total_transferred.saturating_add(amount);
        self.stored_view.store(totals.stored, Ordering::Release);
        self.transferred_view
            .store(totals.total_transferred, Ordering::Release);
        *totals
    }
}

/// An unload in progress. Holds the warehouse gate until finished or
/// dropped; a dropped unload records nothing.
#[derive(Debug)]
#[must_use = "dropping an unload releases the gate without recording the batch"]
pub struct Unload<'a> {
    warehouse: &'a Warehouse,
    amount: u64,
    _permit: GatePermit<'a>,
}

impl Unload<'_> {
    /// Units being unloaded.
    pub const fn amount(&self) -> u64 {
        self.amount
    }

    /// Spend the unloading time, add the batch to the warehouse and release
    /// the gate. Returns the counters right after the increment.
    pub async fn finish(self) -> WarehouseTotals {
        tokio::time::sleep(scaled(self.warehouse.time_per_unit, self.amount)).await;
        let totals = self.warehouse.record(self.amount).await;
        debug!(
            amount = self.amount,
            stored = totals.stored,
            total_transferred = totals.total_transferred,
            "unload recorded"
        );
        totals
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deposit_increments_both_counters() {
        let warehouse = Warehouse::new(1, Duration::from_millis(10)).unwrap();
        let totals = warehouse.deposit(200).await.unwrap();
        assert_eq!(totals.stored, 200);
        assert_eq!(totals.total_transferred, 200);

        let totals = warehouse.deposit(50).await.unwrap();
        assert_eq!(totals, WarehouseTotals {
            stored: 250,
            total_transferred: 250,
        });
        assert_eq!(warehouse.stored(), 250);
        assert_eq!(warehouse.total_transferred(), 250);
    }

    #[tokio::test(start_paused = true)]
    async fn unload_time_scales_with_amount() {
        let warehouse = Warehouse::new(1, Duration::from_millis(10)).unwrap();
        let start = Instant::now();
        warehouse.deposit(300).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn counters_move_only_after_unload_time() {
        let warehouse = Warehouse::new(1, Duration::from_millis(10)).unwrap();
        let unload = warehouse.begin_unload(100).await.unwrap();
        assert_eq!(unload.amount(), 100);
        assert_eq!(warehouse.total_transferred(), 0);
        assert!(warehouse.gate().try_acquire().is_none());

        unload.finish().await;
        assert_eq!(warehouse.total_transferred(), 100);
        assert_eq!(warehouse.gate().holders(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_dock_serializes_unloads() {
        let warehouse = Arc::new(Warehouse::new(1, Duration::from_millis(10)).unwrap());
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let warehouse = Arc::clone(&warehouse);
            handles.push(tokio::spawn(async move {
                warehouse.deposit(100).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        // Four 1-second unloads, one at a time.
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(warehouse.stored(), 400);
        assert_eq!(warehouse.gate().peak_holders(), 1);
    }
}
