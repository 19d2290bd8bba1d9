//! # Inbound Ports

use async_trait::async_trait;
use shared_types::CallbackId;
use tokio::task::JoinHandle;

use crate::domain::{CallbackRequest, DeliveryOutcome};
use crate::error::{DeliveryError, DeliveryFailure};

/// Callback delivery API - inbound port.
#[async_trait]
pub trait CallbackDeliveryApi: Send + Sync {
    /// Start delivering `request`.
    ///
    /// With `retry` set, the retry record is durable when this returns.
    /// The delivery itself runs in the background; the handle can be
    /// awaited or dropped.
    async fn deliver(&self, request: CallbackRequest) -> Result<DeliveryHandle, DeliveryError>;

    /// Raise the halt flag: interrupt every backoff sleep and stop looping.
    /// Records stay persisted. The flag is never cleared.
    fn stop_all(&self);

    fn is_halted(&self) -> bool;

    /// Restart the retry loop of every persisted record not already in
    /// flight. Returns how many were resumed.
    async fn resume_pending(&self) -> Result<usize, DeliveryError>;

    /// Retry loops currently running.
    fn pending_count(&self) -> i64;
}

/// Handle to a running delivery.
pub struct DeliveryHandle {
    pub cb_id: CallbackId,
    join: JoinHandle<DeliveryOutcome>,
}

impl DeliveryHandle {
    pub(crate) fn new(cb_id: CallbackId, join: JoinHandle<DeliveryOutcome>) -> Self {
        Self { cb_id, join }
    }

    /// Wait for the delivery to end.
    pub async fn outcome(self) -> DeliveryOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => DeliveryOutcome::Failed(DeliveryFailure::Transport(format!(
                "delivery task aborted: {}",
                e
            ))),
        }
    }
}
