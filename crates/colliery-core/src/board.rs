//! Status board: the publication side of the simulation.
//!
//! Miners report every state change to the [`StatusBoard`]. The board folds
//! each [`MinerEvent`] into the latest [`SimulationSnapshot`] and forwards the
//! event to subscribers. Renderers either poll or await the snapshot through
//! a [`watch::Receiver`], or follow individual events through a
//! [`broadcast::Receiver`]. Nothing the board hands out aliases the core's
//! own counters.

use colliery_types::{MinerEvent, SimulationSnapshot};
use tokio::sync::{broadcast, watch};

/// Capacity of the event broadcast channel.
///
/// A subscriber that falls behind by more than this many events receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest event.
const EVENT_CAPACITY: usize = 1024;

/// Publishes miner events and simulation snapshots.
#[derive(Debug)]
pub struct StatusBoard {
    /// Broadcast sender for individual miner events.
    events: broadcast::Sender<MinerEvent>,

    /// Latest snapshot.
    snapshot: watch::Sender<SimulationSnapshot>,
}

impl StatusBoard {
    /// Create a board for a run over a deposit of `initial_amount` units
    /// worked by `miner_count` miners.
    pub fn new(initial_amount: u64, miner_count: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot, _) = watch::channel(SimulationSnapshot::initial(initial_amount, miner_count));
        Self { events, snapshot }
    }

    /// Subscribe to every miner event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MinerEvent> {
        self.events.subscribe()
    }

    /// Watch the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<SimulationSnapshot> {
        self.snapshot.subscribe()
    }

    /// Clone of the latest snapshot.
    pub fn snapshot(&self) -> SimulationSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Record a miner event and forward it to subscribers.
    pub fn publish(&self, event: MinerEvent) {
        self.snapshot.send_modify(|snap| snap.apply(&event));
        // No subscribers is not an error: presentation is optional.
        let _receivers = self.events.send(event);
    }

    /// Mark the run complete. Watchers see `complete == true` on their next
    /// read.
    pub fn complete(&self) {
        self.snapshot.send_modify(|snap| {
            snap.complete = true;
            snap.taken_at = chrono::Utc::now();
        });
    }
}
