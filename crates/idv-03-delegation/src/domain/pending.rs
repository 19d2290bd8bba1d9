//! Pending delegation requests.
//!
//! Flow:
//! 1. The executor calls `register()` and gets a oneshot receiver
//! 2. The request is written to the chosen worker's link
//! 3. The link's response pump calls `complete()` with the worker's answer
//! 4. If the link dies, `fail_worker()` resolves every request sent over it

use dashmap::DashMap;
use serde_json::Value;
use shared_types::HandlerId;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::protocol::{CorrelationId, DelegationResponse, WorkerId};
use crate::error::{DelegationError, DelegationResult};

type Reply = oneshot::Sender<DelegationResult<Value>>;

struct PendingRequest {
    sender: Reply,
    worker: WorkerId,
    function: HandlerId,
}

/// Requests sent to workers and not yet answered.
#[derive(Default)]
pub struct PendingRequests {
    pending: DashMap<CorrelationId, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        worker: WorkerId,
        function: &HandlerId,
    ) -> (CorrelationId, oneshot::Receiver<DelegationResult<Value>>) {
        let correlation_id = CorrelationId::new();
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(
            correlation_id,
            PendingRequest {
                sender,
                worker,
                function: function.clone(),
            },
        );
        (correlation_id, receiver)
    }

    /// Deliver a worker's response. Returns false for unknown (timed out or
    /// already failed) correlation ids.
    pub fn complete(&self, response: DelegationResponse) -> bool {
        let Some((correlation_id, pending)) = self.pending.remove(&response.correlation_id)
        else {
            warn!(
                correlation_id = %response.correlation_id,
                "[idv-03] Response for unknown or expired correlation id"
            );
            return false;
        };
        let result = response.into_result().map_err(DelegationError::Remote);
        debug!(
            correlation_id = %correlation_id,
            function = %pending.function,
            ok = result.is_ok(),
            "[idv-03] Delegated request completed"
        );
        pending.sender.send(result).is_ok()
    }

    /// Fail every request outstanding on `worker`. Returns how many.
    pub fn fail_worker(&self, worker: WorkerId) -> usize {
        let lost: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| entry.value().worker == worker)
            .map(|entry| *entry.key())
            .collect();

        let mut failed = 0;
        for correlation_id in lost {
            if let Some((_, pending)) = self.pending.remove(&correlation_id) {
                let _ = pending
                    .sender
                    .send(Err(DelegationError::WorkerLost { worker }));
                failed += 1;
            }
        }
        failed
    }

    /// Forget a request (timed out or never sent).
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.remove(correlation_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
