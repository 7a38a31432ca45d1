//! Counting concurrency gate shared by the deposit and the warehouse.
//!
//! A [`Gate`] caps how many miners may be inside a critical section at once.
//! Acquisition suspends the calling task without occupying a worker thread,
//! and the returned [`GatePermit`] releases the slot when dropped.
//!
//! Every gate keeps two instrumentation counters: the number of current
//! holders and the highest number of simultaneous holders ever observed.
//! Tests use the peak to verify that the cap was never exceeded.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};

/// Errors that can occur when entering a gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// A gate with no slots would never admit anyone.
    #[error("gate {name} must admit at least one holder")]
    ZeroCapacity {
        /// Name of the gate.
        name: &'static str,
    },

    /// The gate was closed while the caller was waiting or before it arrived.
    #[error("gate {name} is closed")]
    Closed {
        /// Name of the gate.
        name: &'static str,
    },
}

/// Counting concurrency limiter with holder instrumentation.
#[derive(Debug)]
pub struct Gate {
    /// Human-readable name used in logs and errors.
    name: &'static str,

    /// Maximum simultaneous holders.
    capacity: usize,

    /// Underlying permit pool.
    semaphore: Semaphore,

    /// Current number of holders.
    holders: AtomicUsize,

    /// Highest number of simultaneous holders observed.
    peak: AtomicUsize,
}

impl Gate {
    /// Create a gate admitting up to `capacity` simultaneous holders.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ZeroCapacity`] if `capacity` is 0.
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::ZeroCapacity { name });
        }
        Ok(Self {
            name,
            capacity,
            semaphore: Semaphore::new(capacity),
            holders: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    /// Wait until a slot is free and take it.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] if the gate has been closed.
    pub async fn acquire(&self) -> Result<GatePermit<'_>, GateError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_closed| GateError::Closed { name: self.name })?;
        Ok(self.admit(permit))
    }

    /// Take a slot only if one is free right now.
    ///
    /// Returns `None` when the gate is full or closed.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        match self.semaphore.try_acquire() {
            Ok(permit) => Some(self.admit(permit)),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => None,
        }
    }

    /// Close the gate. Waiting and future acquirers get [`GateError::Closed`];
    /// current holders keep their slots until they drop them.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Returns `true` if the gate has been closed.
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Name of the gate.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Maximum simultaneous holders.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of tasks holding a slot right now.
    pub fn holders(&self) -> usize {
        self.holders.load(Ordering::Acquire)
    }

    /// Highest number of simultaneous holders since the gate was created.
    pub fn peak_holders(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    fn admit<'a>(&'a self, permit: SemaphorePermit<'a>) -> GatePermit<'a> {
        let now = self.holders.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        self.peak.fetch_max(now, Ordering::AcqRel);
        GatePermit {
            gate: self,
            _permit: permit,
        }
    }
}

/// A held slot in a [`Gate`]. Dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a Gate,
    _permit: SemaphorePermit<'a>,
}

impl GatePermit<'_> {
    /// Name of the gate this permit belongs to.
    pub const fn gate_name(&self) -> &'static str {
        self.gate.name
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        // Runs before `_permit` is dropped, so `holders` never undercounts
        // a task that the semaphore still considers inside.
        self.gate.holders.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        let result = Gate::new("test", 0);
        assert_eq!(result.unwrap_err(), GateError::ZeroCapacity { name: "test" });
    }

    #[tokio::test]
    async fn try_acquire_respects_capacity() {
        let gate = Gate::new("test", 2).unwrap();
        let first = gate.try_acquire();
        let second = gate.try_acquire();
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.holders(), 2);
        assert_eq!(gate.available(), 0);

        drop(first);
        assert_eq!(gate.holders(), 1);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn peak_tracks_highest_occupancy() {
        let gate = Gate::new("test", 3).unwrap();
        {
            let _a = gate.acquire().await.unwrap();
            let _b = gate.acquire().await.unwrap();
            assert_eq!(gate.peak_holders(), 2);
        }
        assert_eq!(gate.holders(), 0);
        let _c = gate.acquire().await.unwrap();
        assert_eq!(gate.peak_holders(), 2);
    }

    #[tokio::test]
    async fn closed_gate_rejects_acquire() {
        let gate = Gate::new("warehouse", 1).unwrap();
        gate.close();
        assert!(gate.is_closed());
        let result = gate.acquire().await;
        assert_eq!(result.unwrap_err(), GateError::Closed { name: "warehouse" });
        assert!(gate.try_acquire().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_never_exceed_capacity() {
        let gate = Arc::new(Gate::new("test", 2).unwrap());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                assert!(gate.holders() <= gate.capacity());
                tokio::time::sleep(Duration::from_millis(50)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(gate.peak_holders(), 2);
        assert_eq!(gate.holders(), 0);
        assert_eq!(gate.available(), 2);
    }
}
