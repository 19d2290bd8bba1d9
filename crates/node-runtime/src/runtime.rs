//! # Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Reload persisted tasks and restart dispatch per request id
//! 2. Sweep deferred messages already covered by the observed height
//! 3. Resume persisted callback retries
//! 4. Start the ledger event handler
//!
//! Tasks come back before the sweep so a recovered message task keeps its
//! place ahead of anything the sweep admits for the same request id.
//!
//! ## Shutdown Sequence
//!
//! 1. Halt callback retries (records stay persisted)
//! 2. Signal every spawned loop
//! 3. Wait, bounded, for the task queue to drain

use std::sync::Arc;

use anyhow::{Context, Result};
use idv_01_task_queue::TaskQueueApi;
use idv_02_block_gate::{AdmissionDecision, BlockGateApi, BlockGateError};
use idv_04_callback_delivery::{CallbackDeliveryApi, CallbackRequest, DeliveryError, DeliveryHandle};
use parking_lot::Mutex;
use shared_types::InboundMessage;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::adapters::HeightAdvanced;
use crate::container::{Collaborators, EngineContainer, NodeConfig};
use crate::wiring::run_ledger_events;

/// What start-up recovery found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub tasks_recovered: usize,
    pub messages_admitted: usize,
    pub callbacks_resumed: usize,
}

/// The node runtime orchestrating the engine.
pub struct NodeRuntime {
    container: Arc<EngineContainer>,
    ledger_events: Mutex<Option<broadcast::Receiver<HeightAdvanced>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Build the engine. Nothing runs until [`NodeRuntime::start`].
    pub fn new(
        config: NodeConfig,
        collaborators: Collaborators,
        ledger_events: broadcast::Receiver<HeightAdvanced>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(EngineContainer::new(config, collaborators)),
            ledger_events: Mutex::new(Some(ledger_events)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Recover persisted state and start the ledger event handler.
    pub async fn start(&self) -> Result<StartupReport> {
        let c = &self.container;
        info!("===========================================");
        info!("  IDV Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Node: {}  Role: {:?}", c.config.node_id, c.config.role);
        info!("===========================================");

        let tasks_recovered = c.queue.recover().await.context("task recovery failed")?;
        let messages_admitted = c.gate.recover().await.context("deferred-message sweep failed")?;
        let callbacks_resumed = c
            .delivery
            .resume_pending()
            .await
            .context("callback resumption failed")?;

        if let Some(events) = self.ledger_events.lock().take() {
            tokio::spawn(run_ledger_events(
                c.gate.clone(),
                events,
                self.shutdown_rx.clone(),
            ));
        }

        let report = StartupReport {
            tasks_recovered,
            messages_admitted,
            callbacks_resumed,
        };
        info!(
            tasks = tasks_recovered,
            messages = messages_admitted,
            callbacks = callbacks_resumed,
            "[node] Recovery complete, node running"
        );
        Ok(report)
    }

    /// Entry point for a message received from a peer.
    pub async fn handle_inbound(
        &self,
        message: InboundMessage,
    ) -> Result<AdmissionDecision, BlockGateError> {
        self.container.gate.admit_or_defer(message).await
    }

    /// Entry point for a ledger new-block notification not coming through
    /// the ledger event stream.
    pub async fn on_new_block(&self, from: u64, to: u64) -> Result<usize, BlockGateError> {
        self.container.gate.on_height_advanced(from, to).await
    }

    /// Deliver a callback to a client application.
    pub async fn deliver(&self, request: CallbackRequest) -> Result<DeliveryHandle, DeliveryError> {
        self.container.delivery.deliver(request).await
    }

    pub fn container(&self) -> Arc<EngineContainer> {
        Arc::clone(&self.container)
    }

    /// Receiver that flips to `true` at shutdown, for loops spawned by the
    /// binary.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Shut down gracefully. Returns whether the task queue drained within
    /// the grace period.
    pub async fn shutdown(&self) -> bool {
        info!("[node] Initiating graceful shutdown...");
        let c = &self.container;

        c.delivery.stop_all();
        self.shutdown_tx.send_replace(true);

        let drained = tokio::time::timeout(c.config.shutdown_grace, c.queue.wait_idle())
            .await
            .is_ok();
        if drained {
            info!("[node] Shutdown complete");
        } else {
            warn!(
                keys = c.queue.queued_keys().len(),
                "[node] Task queue not drained; remaining tasks resume on restart"
            );
        }
        drained
    }
}
