//! Ledger new-block handler.

use idv_02_block_gate::BlockGateApi;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use crate::adapters::HeightAdvanced;

/// Sweep deferred messages on every height advance.
///
/// When events were dropped (lagging receiver) the whole observed range is
/// swept again; the admission locks make that harmless.
pub async fn run_ledger_events(
    gate: Arc<dyn BlockGateApi>,
    mut events: broadcast::Receiver<HeightAdvanced>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("[node] Ledger event handler started");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(HeightAdvanced { from, to }) => {
                    if let Err(e) = gate.on_height_advanced(from, to).await {
                        error!(from, to, "[node] Deferred-message sweep failed: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "[node] Missed ledger events, sweeping everything observed");
                    if let Err(e) = gate.recover().await {
                        error!("[node] Catch-up sweep failed: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
    info!("[node] Ledger event handler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use idv_02_block_gate::{BlockGate, BlockGateConfig, RecordingAdmission};
    use serde_json::json;
    use shared_store::InMemoryStore;
    use shared_types::{InboundMessage, MessageId, NodeId, RequestId};
    use std::time::Duration;

    use crate::adapters::InMemoryLedger;

    #[tokio::test]
    async fn test_advance_admits_deferred_message() {
        let ledger = Arc::new(InMemoryLedger::new("chain-a", 1));
        let admission = Arc::new(RecordingAdmission::new());
        let gate = Arc::new(BlockGate::new(
            BlockGateConfig::for_testing("rp-1"),
            Arc::new(InMemoryStore::new()),
            ledger.clone(),
            admission.clone(),
        ));
        let (stop, stopped) = watch::channel(false);
        let handler = tokio::spawn(run_ledger_events(gate.clone(), ledger.subscribe(), stopped));

        gate.admit_or_defer(InboundMessage {
            message_id: MessageId::from("m-1"),
            request_id: RequestId::from("req-1"),
            height: 3,
            chain_id: "chain-a".to_string(),
            sender_node_id: NodeId::from("idp-1"),
            payload: json!({}),
        })
        .await
        .unwrap();
        assert!(admission.admitted().is_empty());

        ledger.advance_to(3);
        for _ in 0..100 {
            if !admission.admitted().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(admission.admitted(), vec![MessageId::from("m-1")]);

        stop.send_replace(true);
        handler.await.unwrap();
    }
}
