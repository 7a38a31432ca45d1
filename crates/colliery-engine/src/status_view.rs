//! Periodic status view renderer.
//!
//! Polls the latest snapshot at a fixed interval and logs the state of the
//! deposit, the warehouse and every miner. Stops after rendering the
//! snapshot that marks the run complete, or when the run goes away.

use std::time::Duration;

use colliery_types::SimulationSnapshot;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Shortest accepted polling interval.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Render the snapshot every `interval` until the run completes.
pub async fn run(mut snapshots: watch::Receiver<SimulationSnapshot>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let snap = snapshots.borrow_and_update().clone();
        for line in render(&snap) {
            info!("{line}");
        }
        if snap.complete || snapshots.has_changed().is_err() {
            break;
        }
    }
}

/// Lines of one status view.
pub fn render(snap: &SimulationSnapshot) -> Vec<String> {
    let mut lines = vec![
        format!("Deposit: {} units of coal", snap.remaining),
        format!("Warehouse: {} units of coal", snap.stored),
    ];
    lines.extend(snap.miners.iter().map(|(id, status)| {
        if status.carrying > 0 {
            format!("Miner {id}: {} (carrying {})", status.state, status.carrying)
        } else {
            format!("Miner {id}: {}", status.state)
        }
    }));
    lines
}
