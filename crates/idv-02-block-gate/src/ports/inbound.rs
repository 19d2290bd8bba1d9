//! # Inbound Ports

use async_trait::async_trait;
use shared_types::{InboundMessage, MessageId};

use crate::domain::AdmissionDecision;
use crate::error::BlockGateResult;

/// Block-gate API - inbound port.
#[async_trait]
pub trait BlockGateApi: Send + Sync {
    /// Admit `message` now if the observed height covers it, otherwise
    /// persist it until it does.
    ///
    /// # Errors
    /// - `UnrecognizedChain` if the message's chain has never been seen
    /// - `Store` if the deferred record could not be written
    async fn admit_or_defer(&self, message: InboundMessage) -> BlockGateResult<AdmissionDecision>;

    /// Admit every deferred message with `from <= height <= to`.
    ///
    /// Called whenever the observed height advances. Returns the number of
    /// messages admitted by this sweep.
    async fn on_height_advanced(&self, from: u64, to: u64) -> BlockGateResult<usize>;

    /// Sweep everything up to the current observed height (start-up).
    async fn recover(&self) -> BlockGateResult<usize>;

    /// Release the admitted task's hold on the message lock.
    fn release_lock(&self, message_id: &MessageId);

    /// Messages currently deferred.
    async fn deferred_count(&self) -> BlockGateResult<usize>;
}
