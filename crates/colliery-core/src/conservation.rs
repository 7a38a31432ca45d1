//! Conservation law verification for a finished run.
//!
//! Coal is never created or destroyed: every unit that left the deposit is
//! either on a vehicle or in the warehouse. At quiescence no vehicle is
//! loaded, so the check is:
//!
//! ```text
//! initial_amount == remaining + stored
//! stored == total_transferred
//! ```
//!
//! A violation produces a [`ConservationAnomaly`], the run's most critical
//! integrity alert. The coordination protocol makes this impossible; the
//! check guards against regressions in it.

/// Counters observed after every miner has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiescentTotals {
    /// Deposit size at the start of the run.
    pub initial_amount: u64,
    /// Units left in the deposit.
    pub remaining: u64,
    /// Units in the warehouse.
    pub stored: u64,
    /// Units transferred into the warehouse.
    pub total_transferred: u64,
}

/// A detected violation of the conservation law.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConservationAnomaly {
    /// The totals that failed the check.
    pub totals: QuiescentTotals,
    /// Human-readable description of the violation.
    pub message: String,
}

/// The result of a conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// All coal is accounted for.
    Balanced,
    /// Coal appeared or vanished.
    Anomaly(ConservationAnomaly),
}

/// Verify the conservation law for a quiescent run.
pub fn verify_conservation(totals: QuiescentTotals) -> ConservationResult {
    let Some(accounted) = totals.remaining.checked_add(totals.stored) else {
        return anomaly(totals, "remaining + stored overflows u64".to_owned());
    };

    if accounted != totals.initial_amount {
        return anomaly(
            totals,
            format!(
                "initial amount {} != remaining {} + stored {}",
                totals.initial_amount, totals.remaining, totals.stored
            ),
        );
    }

    if totals.stored != totals.total_transferred {
        return anomaly(
            totals,
            format!(
                "stored {} != total transferred {}",
                totals.stored, totals.total_transferred
            ),
        );
    }

    ConservationResult::Balanced
}

fn anomaly(totals: QuiescentTotals, detail: String) -> ConservationResult {
    ConservationResult::Anomaly(ConservationAnomaly {
        totals,
        message: format!("CONSERVATION_ANOMALY: {detail}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(initial: u64, remaining: u64, stored: u64, transferred: u64) -> QuiescentTotals {
        QuiescentTotals {
            initial_amount: initial,
            remaining,
            stored,
            total_transferred: transferred,
        }
    }

    #[test]
    fn balanced_when_everything_transferred() {
        assert_eq!(
            verify_conservation(totals(2000, 0, 2000, 2000)),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn balanced_for_partial_run() {
        assert_eq!(
            verify_conservation(totals(2000, 600, 1400, 1400)),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn lost_coal_is_an_anomaly() {
        let result = verify_conservation(totals(2000, 0, 1800, 1800));
        let ConservationResult::Anomaly(anomaly) = result else {
            panic!("expected anomaly");
        };
        assert!(anomaly.message.contains("initial amount 2000"));
    }

    #[test]
    fn diverging_counters_are_an_anomaly() {
        let result = verify_conservation(totals(2000, 0, 2000, 1800));
        assert!(matches!(result, ConservationResult::Anomaly(_)));
    }

    #[test]
    fn overflow_is_an_anomaly() {
        let result = verify_conservation(totals(u64::MAX, u64::MAX, 1, 1));
        assert!(matches!(result, ConservationResult::Anomaly(_)));
    }
}
