//! Delegation error types.

use shared_types::HandlerId;
use thiserror::Error;

use crate::domain::WorkerId;

#[derive(Debug, Error)]
pub enum DelegationError {
    /// No function registered under this id.
    #[error("Unknown function: {function}")]
    UnknownFunction { function: HandlerId },

    /// The function ran and failed.
    #[error("Function {function} failed: {cause}")]
    Failed { function: HandlerId, cause: String },

    /// The worker disconnected before responding.
    #[error("Worker {worker} lost")]
    WorkerLost { worker: WorkerId },

    /// Delegated mode with no connected worker.
    #[error("No worker available")]
    NoWorkerAvailable,

    /// The worker did not respond in time.
    #[error("No response after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The worker reported an error.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Malformed frame.
    #[error("Frame codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DelegationError {
    /// True when the task never got a verdict and must be run again, as
    /// opposed to having failed.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::WorkerLost { .. } | Self::NoWorkerAvailable)
    }
}

pub type DelegationResult<T> = Result<T, DelegationError>;
