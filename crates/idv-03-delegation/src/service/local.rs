//! In-process execution.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{HandlerId, Task};
use std::sync::Arc;
use tracing::debug;

use crate::config::ExecutionMode;
use crate::domain::FunctionRegistry;
use crate::error::{DelegationError, DelegationResult};
use crate::ports::TaskDelegation;

/// Resolve `function` and run it.
pub async fn invoke(
    functions: &FunctionRegistry,
    function: &HandlerId,
    args: Value,
) -> DelegationResult<Value> {
    let f = functions
        .resolve(function)
        .ok_or_else(|| DelegationError::UnknownFunction {
            function: function.clone(),
        })?;
    f.call(args).await.map_err(|cause| DelegationError::Failed {
        function: function.clone(),
        cause,
    })
}

/// Standalone mode executor.
pub struct LocalExecutor {
    functions: Arc<FunctionRegistry>,
}

impl LocalExecutor {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self { functions }
    }
}

#[async_trait]
impl TaskDelegation for LocalExecutor {
    async fn execute(&self, task: &Task) -> DelegationResult<Value> {
        debug!(
            request_id = %task.request_id,
            function = %task.callback,
            "[idv-03] Executing locally"
        );
        invoke(&self.functions, &task.callback, task.callback_args.clone()).await
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Local
    }
}
