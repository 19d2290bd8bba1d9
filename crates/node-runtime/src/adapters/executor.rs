//! Task queue → delegation layer.

use async_trait::async_trait;
use idv_01_task_queue::{TaskExecutor, TaskOutcome};
use idv_03_delegation::TaskDelegation;
use shared_types::Task;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs queued tasks through the configured delegation mode.
///
/// Worker loss and an empty worker pool are reported as interruptions so the
/// queue re-runs the task from its persisted record.
pub struct DelegationExecutor {
    delegation: Arc<dyn TaskDelegation>,
}

impl DelegationExecutor {
    pub fn new(delegation: Arc<dyn TaskDelegation>) -> Self {
        Self { delegation }
    }
}

#[async_trait]
impl TaskExecutor for DelegationExecutor {
    async fn execute(&self, task: &Task) -> TaskOutcome {
        match self.delegation.execute(task).await {
            Ok(value) => {
                debug!(request_id = %task.request_id, function = %task.callback, "[node] Task succeeded");
                TaskOutcome::Success(value)
            }
            Err(e) if e.is_interruption() => {
                warn!(request_id = %task.request_id, function = %task.callback, "[node] Task interrupted: {}", e);
                TaskOutcome::interrupted(e.to_string())
            }
            Err(e) => TaskOutcome::failure(e.to_string()),
        }
    }
}
