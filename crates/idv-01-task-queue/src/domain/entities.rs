//! # Domain Entities
//!
//! `KeyQueue` holds the *waiting* tasks of one request id. The task being
//! executed is owned by the key's runner, not by the queue.

use serde_json::Value;
use shared_types::{RequestId, Task};
use std::collections::VecDeque;

use super::errors::TaskQueueError;

/// Result of executing a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The callback resolved.
    Success(Value),
    /// The callback failed. The key still advances.
    Failure { cause: String },
    /// Execution was cut short (e.g. the worker disconnected). The task is
    /// run again from its persisted record.
    Interrupted { reason: String },
}

impl TaskOutcome {
    pub fn failure(cause: impl Into<String>) -> Self {
        Self::Failure {
            cause: cause.into(),
        }
    }

    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// A task with its position in the key's queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTask {
    pub seq: u64,
    pub task: Task,
}

/// Waiting tasks for one request id, ordered by sequence number.
#[derive(Debug, Default)]
pub struct KeyQueue {
    tasks: VecDeque<QueuedTask>,
}

impl KeyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from recovered tasks (any order).
    pub fn from_recovered(mut tasks: Vec<QueuedTask>) -> Self {
        tasks.sort_by_key(|t| t.seq);
        Self {
            tasks: tasks.into(),
        }
    }

    /// Insert keeping sequence order.
    ///
    /// Enqueues usually arrive in order, so the scan starts from the back.
    pub fn insert(&mut self, queued: QueuedTask) {
        let pos = self
            .tasks
            .iter()
            .rposition(|t| t.seq < queued.seq)
            .map_or(0, |p| p + 1);
        self.tasks.insert(pos, queued);
    }

    /// Put a task back at the head (interrupted execution).
    pub fn push_front(&mut self, queued: QueuedTask) {
        self.tasks.push_front(queued);
    }

    pub fn pop_front(&mut self) -> Option<QueuedTask> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Store key of a persisted task: `{request_id}/{seq:020}`.
pub fn task_key(request_id: &RequestId, seq: u64) -> String {
    format!("{}/{:020}", request_id, seq)
}

/// Inverse of [`task_key`]. Request ids may themselves contain `/`.
pub fn parse_task_key(key: &str) -> Result<(RequestId, u64), TaskQueueError> {
    let (request_id, seq) = key
        .rsplit_once('/')
        .ok_or_else(|| TaskQueueError::MalformedKey(key.to_string()))?;
    let seq = seq
        .parse::<u64>()
        .map_err(|_| TaskQueueError::MalformedKey(key.to_string()))?;
    Ok((RequestId::from(request_id), seq))
}
