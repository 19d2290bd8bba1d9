//! # Inbound Ports
//!
//! API exposed by the task queue.

use async_trait::async_trait;
use shared_types::{RequestId, Task};

use crate::domain::TaskQueueError;

/// Task queue API - inbound port.
#[async_trait]
pub trait TaskQueueApi: Send + Sync {
    /// Persist `task` and append it to its request id's queue.
    ///
    /// Starts the key's runner unless a task for that key is already
    /// executing. Returns the task's sequence number.
    async fn enqueue(&self, task: Task) -> Result<u64, TaskQueueError>;

    /// Reload every persisted task and restart dispatch for each key.
    ///
    /// Keys already live in memory are left untouched, so calling this twice
    /// does not duplicate work. Returns the number of tasks reloaded.
    async fn recover(&self) -> Result<usize, TaskQueueError>;

    /// Tasks waiting (not executing).
    fn pending_count(&self) -> i64;

    /// Tasks executing.
    fn processing_count(&self) -> i64;

    /// Request ids with a live queue.
    fn queued_keys(&self) -> Vec<RequestId>;

    /// Waiting tasks for one request id.
    fn queue_len(&self, request_id: &RequestId) -> usize;

    /// Whether a runner is active for `request_id`.
    fn is_running(&self, request_id: &RequestId) -> bool;
}
