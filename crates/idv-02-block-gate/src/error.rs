//! Block-gate error types.

use shared_store::StoreError;
use thiserror::Error;

/// Errors surfaced to the caller of admission.
#[derive(Debug, Error)]
pub enum BlockGateError {
    /// The message names a ledger instance this node has never seen.
    #[error("Unrecognized chain: {chain_id}")]
    UnrecognizedChain { chain_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The downstream admission (task creation) failed.
    #[error("Admission failed: {0}")]
    Admission(String),
}

pub type BlockGateResult<T> = Result<T, BlockGateError>;
