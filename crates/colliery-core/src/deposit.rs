//! The depleting coal deposit.
//!
//! The [`Deposit`] guards the remaining amount with two nested guards: the
//! extraction [`Gate`] caps how many miners mine at once, and a mutex inside
//! it serializes the take-and-decrement decision. Mining time is spent
//! holding the gate but not the mutex, so up to `extraction_limit` miners
//! mine concurrently while every decrement stays atomic.
//!
//! Depletion is not an error: an extraction that finds the deposit empty
//! returns 0 units.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::gate::{Gate, GateError, GatePermit};

/// Name of the extraction gate in logs and errors.
pub const EXTRACTION_GATE: &str = "extraction";

/// The finite resource miners extract from.
#[derive(Debug)]
pub struct Deposit {
    /// Caps simultaneous extractions.
    gate: Gate,

    /// Authoritative remaining amount; mutated only while holding `gate`.
    remaining: Mutex<u64>,

    /// Lock-free copy of `remaining` for observers. May lag behind.
    remaining_view: AtomicU64,

    /// Mining time per unit taken.
    time_per_unit: Duration,
}

impl Deposit {
    /// Create a deposit holding `initial_amount` units.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ZeroCapacity`] if `extraction_limit` is 0.
    pub fn new(
        initial_amount: u64,
        extraction_limit: usize,
        time_per_unit: Duration,
    ) -> Result<Self, GateError> {
        Ok(Self {
            gate: Gate::new(EXTRACTION_GATE, extraction_limit)?,
            remaining: Mutex::new(initial_amount),
            remaining_view: AtomicU64::new(initial_amount),
            time_per_unit,
        })
    }

    /// Enter the extraction gate and take up to `capacity` units.
    ///
    /// The returned [`Extraction`] keeps the gate held. Call
    /// [`Extraction::finish`] to spend the mining time and release it.
    /// When the deposit is already empty the extraction carries 0 units.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the extraction gate was closed.
    pub async fn begin_extraction(&self, capacity: u64) -> Result<Extraction<'_>, GateError> {
        let permit = self.gate.acquire().await?;

        let (amount, remaining) = {
            let mut remaining = self.remaining.lock().await;
            let take = capacity.min(*remaining);
            *remaining = remaining.saturating_sub(take);
            self.remaining_view.store(*remaining, Ordering::Release);
            (take, *remaining)
        };

        debug!(amount, remaining, "extraction started");

        Ok(Extraction {
            amount,
            remaining,
            duration: scaled(self.time_per_unit, amount),
            _permit: permit,
        })
    }

    /// Extract up to `capacity` units: take them, spend the mining time and
    /// release the gate. Returns 0 once the deposit is empty.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the extraction gate was closed.
    pub async fn extract(&self, capacity: u64) -> Result<u64, GateError> {
        let extraction = self.begin_extraction(capacity).await?;
        Ok(extraction.finish().await)
    }

    /// Remaining units as last published. May be stale under contention.
    pub fn remaining(&self) -> u64 {
        self.remaining_view.load(Ordering::Acquire)
    }

    /// The extraction gate, for instrumentation.
    pub const fn gate(&self) -> &Gate {
        &self.gate
    }
}

/// An extraction in progress. Holds the extraction gate until finished or
/// dropped.
#[derive(Debug)]
#[must_use = "dropping an extraction releases the gate without mining time"]
pub struct Extraction<'a> {
    amount: u64,
    remaining: u64,
    duration: Duration,
    _permit: GatePermit<'a>,
}

impl Extraction<'_> {
    /// Units taken from the deposit (0 if it was empty).
    pub const fn amount(&self) -> u64 {
        self.amount
    }

    /// Units left in the deposit right after this extraction's decrement.
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Returns `true` if nothing was taken because the deposit is empty.
    pub const fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Spend the mining time, release the gate and return the amount mined.
    ///
    /// An empty extraction returns immediately.
    pub async fn finish(self) -> u64 {
        if self.amount > 0 {
            tokio::time::sleep(self.duration).await;
        }
        self.amount
    }
}

/// `per_unit * units`, saturating instead of overflowing.
///
/// Unit counts above `u32::MAX` are clamped; `SimulationConfig::validate`
/// keeps vehicle loads within that range.
pub(crate) fn scaled(per_unit: Duration, units: u64) -> Duration {
    let units = u32::try_from(units).unwrap_or(u32::MAX);
    per_unit.saturating_mul(units)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;

    fn deposit(initial: u64) -> Deposit {
        Deposit::new(initial, 2, Duration::from_millis(10)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn extract_takes_up_to_capacity() {
        let deposit = deposit(500);
        assert_eq!(deposit.extract(200).await.unwrap(), 200);
        assert_eq!(deposit.remaining(), 300);
        assert_eq!(deposit.extract(200).await.unwrap(), 200);
        assert_eq!(deposit.extract(200).await.unwrap(), 100);
        assert_eq!(deposit.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn depletion_is_idempotent() {
        let deposit = deposit(150);
        assert_eq!(deposit.extract(200).await.unwrap(), 150);
        for _ in 0..5 {
            assert_eq!(deposit.extract(200).await.unwrap(), 0);
            assert_eq!(deposit.remaining(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn mining_time_scales_with_amount() {
        let deposit = deposit(1000);
        let start = Instant::now();
        deposit.extract(200).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_extraction_takes_no_time() {
        let deposit = deposit(0);
        let start = Instant::now();
        let extraction = deposit.begin_extraction(200).await.unwrap();
        assert!(extraction.is_empty());
        assert_eq!(extraction.finish().await, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn extraction_holds_gate_until_finished() {
        let deposit = Deposit::new(1000, 1, Duration::from_millis(1)).unwrap();
        let extraction = deposit.begin_extraction(100).await.unwrap();
        assert_eq!(extraction.amount(), 100);
        assert_eq!(extraction.remaining(), 900);
        assert_eq!(deposit.gate().holders(), 1);
        assert!(deposit.gate().try_acquire().is_none());

        extraction.finish().await;
        assert_eq!(deposit.gate().holders(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_extractors_never_overdraw() {
        let deposit = Arc::new(deposit(2000));
        let mut handles = Vec::new();
        for _ in 0..7 {
            let deposit = Arc::clone(&deposit);
            handles.push(tokio::spawn(async move {
                let mut total = 0_u64;
                loop {
                    let taken = deposit.extract(300).await.unwrap();
                    if taken == 0 {
                        break total;
                    }
                    total += taken;
                }
            }));
        }

        let mut extracted = 0_u64;
        for handle in handles {
            extracted += handle.await.unwrap();
        }
        assert_eq!(extracted, 2000);
        assert_eq!(deposit.remaining(), 0);
        assert!(deposit.gate().peak_holders() <= 2);
    }

    #[test]
    fn scaled_saturates() {
        assert_eq!(scaled(Duration::from_millis(10), 3), Duration::from_millis(30));
        assert_eq!(scaled(Duration::MAX, 2), Duration::MAX);
    }
}
