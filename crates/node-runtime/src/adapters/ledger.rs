//! In-process ledger view.
//!
//! Stands in for the ledger client: tracks the observed height and the known
//! chain instances, and broadcasts every height advance to the runtime's
//! ledger-event handler.

use idv_02_block_gate::{ChainStatus, LedgerView};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 256;

/// The observed height moved from `from - 1` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightAdvanced {
    pub from: u64,
    pub to: u64,
}

pub struct InMemoryLedger {
    height: AtomicU64,
    chains: RwLock<HashMap<String, ChainStatus>>,
    events: broadcast::Sender<HeightAdvanced>,
}

impl InMemoryLedger {
    /// Ledger following `chain_id`, observed up to `height`.
    pub fn new(chain_id: &str, height: u64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut chains = HashMap::new();
        chains.insert(chain_id.to_string(), ChainStatus::Current);
        Self {
            height: AtomicU64::new(height),
            chains: RwLock::new(chains),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HeightAdvanced> {
        self.events.subscribe()
    }

    /// Record a new block. Returns the advance, or `None` if `height` is not
    /// above the observed height.
    pub fn advance_to(&self, height: u64) -> Option<HeightAdvanced> {
        let previous = self.height.fetch_max(height, Ordering::SeqCst);
        if height <= previous {
            return None;
        }
        let advance = HeightAdvanced {
            from: previous + 1,
            to: height,
        };
        // No subscriber is fine: the start-up sweep covers what was missed
        let _ = self.events.send(advance);
        debug!(from = advance.from, to = advance.to, "[node] Ledger height advanced");
        Some(advance)
    }

    /// Switch to a new ledger instance; the current one becomes historical.
    pub fn switch_chain(&self, chain_id: &str, height: u64) {
        {
            let mut chains = self.chains.write();
            for status in chains.values_mut() {
                *status = ChainStatus::Historical;
            }
            chains.insert(chain_id.to_string(), ChainStatus::Current);
        }
        self.height.store(height, Ordering::SeqCst);
    }
}

impl LedgerView for InMemoryLedger {
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
