//! # Inbound Ports

use async_trait::async_trait;
use serde_json::Value;
use shared_types::Task;

use crate::config::ExecutionMode;
use crate::error::DelegationResult;

/// Runs a task's callback somewhere - inbound port.
#[async_trait]
pub trait TaskDelegation: Send + Sync {
    /// Execute `task.callback` with `task.callback_args`.
    ///
    /// Errors for which [`crate::DelegationError::is_interruption`] is true
    /// mean the task did not run to a verdict.
    async fn execute(&self, task: &Task) -> DelegationResult<Value>;

    fn mode(&self) -> ExecutionMode;
}
