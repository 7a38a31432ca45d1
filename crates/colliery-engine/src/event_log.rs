//! Plain event log renderer.
//!
//! Subscribes to the status board's event stream and writes one log line per
//! miner event, until the run ends and the stream closes.

use colliery_types::{FinishReason, MinerEvent, MinerEventKind};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Log every event until the sender side is dropped.
pub async fn run(mut events: broadcast::Receiver<MinerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match describe(&event) {
                Some(line) => info!(miner = %event.miner, "{line}"),
                None => debug!(miner = %event.miner, kind = ?event.kind, "miner event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event log fell behind, some events were not logged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Human-readable line for an event, or `None` for events that only show
/// up at debug level.
pub fn describe(event: &MinerEvent) -> Option<String> {
    let id = event.miner;
    let line = match event.kind {
        MinerEventKind::Extracting { .. } => return None,
        MinerEventKind::Extracted { amount, remaining } => format!(
            "Miner {id} mined {amount} units of coal. Left in the deposit: {remaining} units."
        ),
        MinerEventKind::Transporting { .. } => {
            format!("Miner {id} is transporting coal to the warehouse...")
        }
        MinerEventKind::Depositing { .. } => format!("Miner {id} is unloading coal..."),
        MinerEventKind::Deposited { stored, .. } => {
            format!("Miner {id} finished unloading. Warehouse stock: {stored}")
        }
        MinerEventKind::Finished {
            reason: FinishReason::TransferComplete,
        } => format!("Miner {id} noticed every unit has been transferred and stops working."),
        MinerEventKind::Finished {
            reason: FinishReason::DepositExhausted,
        } => format!("Miner {id} finished work."),
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use colliery_types::MinerId;

    use super::*;

    fn event(kind: MinerEventKind) -> MinerEvent {
        MinerEvent {
            miner: MinerId(3),
            kind,
        }
    }

    #[test]
    fn extracted_line_reports_remaining() {
        let line = describe(&event(MinerEventKind::Extracted {
            amount: 200,
            remaining: 1400,
        }));
        assert_eq!(
            line.as_deref(),
            Some("Miner 3 mined 200 units of coal. Left in the deposit: 1400 units.")
        );
    }

    #[test]
    fn extracting_is_debug_only() {
        let line = describe(&event(MinerEventKind::Extracting {
            amount: 200,
            remaining: 1400,
        }));
        assert!(line.is_none());
    }

    #[test]
    fn finish_reasons_read_differently() {
        let noticed = describe(&event(MinerEventKind::Finished {
            reason: FinishReason::TransferComplete,
        }));
        let exhausted = describe(&event(MinerEventKind::Finished {
            reason: FinishReason::DepositExhausted,
        }));
        assert_ne!(noticed, exhausted);
        assert_eq!(exhausted.as_deref(), Some("Miner 3 finished work."));
    }

    #[tokio::test]
    async fn stops_when_stream_closes() {
        let (tx, rx) = broadcast::channel(8);
        let _receivers = tx.send(event(MinerEventKind::Depositing { carrying: 10 }));
        drop(tx);
        // Returns once the buffered event is drained and the channel closes.
        run(rx).await;
    }
}
