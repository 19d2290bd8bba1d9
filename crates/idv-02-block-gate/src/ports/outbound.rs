//! # Outbound Ports
//!
//! The ledger client (height and chain identity) and the admission sink
//! (turns an admitted message into a task).

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{InboundMessage, MessageId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ChainStatus;
use crate::error::{BlockGateError, BlockGateResult};

/// Local view of the shared ledger - outbound port.
pub trait LedgerView: Send + Sync {
    /// Highest block height observed by this node.
    fn observed_height(&self) -> u64;

    /// Whether `chain_id` is the followed ledger instance, an earlier one,
    /// or unknown.
    fn chain_status(&self, chain_id: &str) -> ChainStatus;
}

/// Receives admitted messages - outbound port.
#[async_trait]
pub trait MessageAdmission: Send + Sync {
    /// Hand the message over for processing. When this returns `Ok` the
    /// work must be durable.
    async fn admit(&self, message: InboundMessage) -> BlockGateResult<()>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Ledger with a settable height and chain table.
pub struct MockLedger {
    height: AtomicU64,
    chains: RwLock<HashMap<String, ChainStatus>>,
}

impl MockLedger {
    /// Ledger following `chain_id` at `height`.
    pub fn new(chain_id: &str, height: u64) -> Self {
        let mut chains = HashMap::new();
        chains.insert(chain_id.to_string(), ChainStatus::Current);
        Self {
            height: AtomicU64::new(height),
            chains: RwLock::new(chains),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn add_historical(&self, chain_id: &str) {
        self.chains
            .write()
            .insert(chain_id.to_string(), ChainStatus::Historical);
    }
}

impl LedgerView for MockLedger {
    fn observed_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    fn chain_status(&self, chain_id: &str) -> ChainStatus {
        self.chains
            .read()
            .get(chain_id)
            .copied()
            .unwrap_or(ChainStatus::Unknown)
    }
}

/// Admission sink that records message ids in admission order.
#[derive(Default)]
pub struct RecordingAdmission {
    admitted: Mutex<Vec<MessageId>>,
    fail_next: Mutex<bool>,
}

impl RecordingAdmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admitted(&self) -> Vec<MessageId> {
        self.admitted.lock().clone()
    }

    /// Make the next `admit` call fail.
    pub fn fail_next(&self) {
        *self.fail_next.lock() = true;
    }
}

#[async_trait]
impl MessageAdmission for RecordingAdmission {
    async fn admit(&self, message: InboundMessage) -> BlockGateResult<()> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            return Err(BlockGateError::Admission("injected failure".into()));
        }
        self.admitted.lock().push(message.message_id);
        Ok(())
    }
}
