//! Block-gate ↔ task queue.
//!
//! An admitted message becomes a task keyed by its request id. The task's
//! completion handler gives the admission lock back to the gate.

use async_trait::async_trait;
use idv_01_task_queue::{CompletionHandler, TaskOutcome, TaskQueueApi};
use idv_02_block_gate::{BlockGate, BlockGateApi, BlockGateError, BlockGateResult, MessageAdmission};
use serde_json::json;
use shared_types::{HandlerId, InboundMessage, MessageId, NodeId, Task};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Completion handler id that releases a message's admission lock.
pub const RELEASE_MESSAGE_LOCK: &str = "release_message_lock";

/// Turns admitted messages into persisted tasks.
pub struct QueueAdmission {
    node_id: NodeId,
    message_handler: HandlerId,
    queue: Arc<dyn TaskQueueApi>,
}

impl QueueAdmission {
    pub fn new(node_id: NodeId, message_handler: HandlerId, queue: Arc<dyn TaskQueueApi>) -> Self {
        Self {
            node_id,
            message_handler,
            queue,
        }
    }

    /// The task an admitted message is processed by.
    pub fn task_for(&self, message: &InboundMessage) -> BlockGateResult<Task> {
        let args =
            serde_json::to_value(message).map_err(|e| BlockGateError::Admission(e.to_string()))?;
        Ok(Task::new(
            self.node_id.clone(),
            message.request_id.clone(),
            self.message_handler.clone(),
            args,
        )
        .with_on_finished(
            HandlerId::from(RELEASE_MESSAGE_LOCK),
            json!({ "message_id": message.message_id }),
        ))
    }
}

#[async_trait]
impl MessageAdmission for QueueAdmission {
    async fn admit(&self, message: InboundMessage) -> BlockGateResult<()> {
        let task = self.task_for(&message)?;
        let seq = self
            .queue
            .enqueue(task)
            .await
            .map_err(|e| BlockGateError::Admission(e.to_string()))?;
        debug!(
            message_id = %message.message_id,
            request_id = %message.request_id,
            seq,
            "[node] Message admitted as task"
        );
        Ok(())
    }
}

/// Gives the admitted task's lock hold back to the gate.
///
/// Holds the gate weakly: the gate owns the admission path that leads back
/// here.
pub struct ReleaseMessageLock {
    gate: Weak<BlockGate>,
}

impl ReleaseMessageLock {
    pub fn new(gate: Weak<BlockGate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl CompletionHandler for ReleaseMessageLock {
    async fn on_finished(&self, task: &Task, _outcome: &TaskOutcome) {
        let message_id = match task
            .on_finished_args
            .get("message_id")
            .cloned()
            .map(serde_json::from_value::<MessageId>)
        {
            Some(Ok(id)) => id,
            _ => {
                warn!(request_id = %task.request_id, "[node] Completion args carry no message id");
                return;
            }
        };
        match self.gate.upgrade() {
            Some(gate) => gate.release_lock(&message_id),
            None => debug!(message_id = %message_id, "[node] Gate gone, lock not released"),
        }
    }
}
