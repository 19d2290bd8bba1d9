//! # Domain Errors

use shared_store::StoreError;
use thiserror::Error;

/// Task queue errors.
///
/// Execution failures are not errors of the queue: they are reported through
/// `TaskOutcome` and metrics. Only persistence problems surface here.
#[derive(Debug, Error)]
pub enum TaskQueueError {
    /// The durable store rejected a read or write.
    #[error("Task store error: {0}")]
    Store(#[from] StoreError),

    /// A persisted key does not follow `{request_id}/{seq}`.
    #[error("Malformed task key: {0}")]
    MalformedKey(String),
}
