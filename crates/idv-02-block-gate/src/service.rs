//! # Block-Gate Service
//!
//! Two paths can admit a deferred message: its own arrival (if the height
//! moved while it was being persisted) and the sweep run on every height
//! advance. Both go through [`AdmissionLocks`], so whichever acquires the
//! lock first admits and the other is a no-op. A re-sent copy admitted
//! directly clears the records left by an earlier deferral.

use async_trait::async_trait;
use shared_store::{
    get_record, list_range_records, put_record, DurableStore, Namespace, DEFERRED_INDEX,
    DEFERRED_MESSAGES,
};
use shared_types::{DeferredMessage, InboundMessage, MessageId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::BlockGateConfig;
use crate::domain::{index_key, index_range, AdmissionDecision, AdmissionLocks, ChainStatus};
use crate::error::{BlockGateError, BlockGateResult};
use crate::ports::{BlockGateApi, LedgerView, MessageAdmission};

const MESSAGE_KIND: &str = "deferred message";
const INDEX_KIND: &str = "deferred index entry";

/// Block-height admission gate.
pub struct BlockGate {
    messages_ns: Namespace,
    index_ns: Namespace,
    store: Arc<dyn DurableStore>,
    ledger: Arc<dyn LedgerView>,
    admission: Arc<dyn MessageAdmission>,
    locks: AdmissionLocks,
    config: BlockGateConfig,
}

impl BlockGate {
    pub fn new(
        config: BlockGateConfig,
        store: Arc<dyn DurableStore>,
        ledger: Arc<dyn LedgerView>,
        admission: Arc<dyn MessageAdmission>,
    ) -> Self {
        Self {
            messages_ns: Namespace::new(DEFERRED_MESSAGES, &config.node_id),
            index_ns: Namespace::new(DEFERRED_INDEX, &config.node_id),
            store,
            ledger,
            admission,
            locks: AdmissionLocks::new(),
            config,
        }
    }

    /// Admission locks currently held.
    pub fn locks(&self) -> &AdmissionLocks {
        &self.locks
    }

    pub fn config(&self) -> &BlockGateConfig {
        &self.config
    }

    async fn admit_now(&self, message: InboundMessage) -> BlockGateResult<AdmissionDecision> {
        let message_id = message.message_id.clone();
        if !self.locks.try_acquire(&message_id) {
            return Ok(AdmissionDecision::AlreadyAdmitted);
        }

        // A re-sent message can still have records from an earlier deferral
        let deferred = match self.load_deferred(&message_id).await {
            Ok(deferred) => deferred,
            Err(e) => {
                self.locks.abandon(&message_id);
                return Err(e);
            }
        };
        if let Err(e) = self.admission.admit(message).await {
            self.locks.abandon(&message_id);
            return Err(e);
        }
        if let Some(record) = deferred {
            self.clear_deferred(&message_id, &index_key(record.height, &message_id)).await;
        }
        self.locks.release(&message_id);
        debug!(message_id = %message_id, "[idv-02] Message admitted");
        Ok(AdmissionDecision::Admitted)
    }

    async fn defer(&self, message: InboundMessage) -> BlockGateResult<AdmissionDecision> {
        let message_id = message.message_id.clone();
        let height = message.height;
        let key = index_key(height, &message_id);

        let record = DeferredMessage {
            message_id: message_id.clone(),
            height,
            node_id: self.config.node_id.clone(),
            raw_message: message,
        };
        put_record(
            self.store.as_ref(),
            &self.messages_ns,
            message_id.as_str(),
            MESSAGE_KIND,
            &record,
        )
        .await?;
        put_record(self.store.as_ref(), &self.index_ns, &key, INDEX_KIND, &message_id).await?;
        debug!(
            message_id = %message_id,
            height,
            "[idv-02] Message deferred until height is observed"
        );

        // The sweep covering this height may have run while we were writing
        if self.ledger.observed_height() >= height && self.admit_deferred(&message_id, &key).await?
        {
            return Ok(AdmissionDecision::Admitted);
        }
        Ok(AdmissionDecision::Deferred)
    }

    /// Admit one deferred message if its lock is free. Returns whether this
    /// call performed the admission.
    async fn admit_deferred(&self, message_id: &MessageId, key: &str) -> BlockGateResult<bool> {
        if !self.locks.try_acquire(message_id) {
            debug!(message_id = %message_id, "[idv-02] Admission lock held, skipping");
            return Ok(false);
        }

        let record = match self.load_deferred(message_id).await {
            Ok(record) => record,
            Err(e) => {
                self.locks.abandon(message_id);
                return Err(e);
            }
        };

        let Some(record) = record else {
            // Admitted and finished by another path; only the index entry is left
            self.locks.abandon(message_id);
            self.store.delete(&self.index_ns, key).await?;
            return Ok(false);
        };

        if let Err(e) = self.admission.admit(record.raw_message).await {
            self.locks.abandon(message_id);
            return Err(e);
        }

        self.clear_deferred(message_id, key).await;
        self.locks.release(message_id);

        debug!(
            message_id = %message_id,
            height = record.height,
            "[idv-02] Deferred message admitted"
        );
        Ok(true)
    }

    async fn load_deferred(
        &self,
        message_id: &MessageId,
    ) -> BlockGateResult<Option<DeferredMessage>> {
        Ok(get_record(
            self.store.as_ref(),
            &self.messages_ns,
            message_id.as_str(),
            MESSAGE_KIND,
        )
        .await?)
    }

    /// Delete both deferred records of an admitted message. Failures are
    /// logged only; the admission lock keeps a leftover from re-admitting
    /// while the task runs.
    async fn clear_deferred(&self, message_id: &MessageId, key: &str) {
        if let Err(e) = self.store.delete(&self.index_ns, key).await {
            error!(message_id = %message_id, "[idv-02] Failed to clear deferred index: {}", e);
        }
        if let Err(e) = self
            .store
            .delete(&self.messages_ns, message_id.as_str())
            .await
        {
            error!(message_id = %message_id, "[idv-02] Failed to clear deferred message: {}", e);
        }
    }
}

#[async_trait]
impl BlockGateApi for BlockGate {
    async fn admit_or_defer(&self, message: InboundMessage) -> BlockGateResult<AdmissionDecision> {
        match self.ledger.chain_status(&message.chain_id) {
            ChainStatus::Unknown => {
                warn!(
                    message_id = %message.message_id,
                    chain_id = %message.chain_id,
                    "[idv-02] Rejecting message from unrecognized chain"
                );
                Err(BlockGateError::UnrecognizedChain {
                    chain_id: message.chain_id,
                })
            }
            _ if self.locks.is_held(&message.message_id) => {
                Ok(AdmissionDecision::AlreadyAdmitted)
            }
            ChainStatus::Historical => self.admit_now(message).await,
            ChainStatus::Current if self.ledger.observed_height() >= message.height => {
                self.admit_now(message).await
            }
            ChainStatus::Current => self.defer(message).await,
        }
    }

    async fn on_height_advanced(&self, from: u64, to: u64) -> BlockGateResult<usize> {
        if from > to {
            return Ok(0);
        }
        let (start, end) = index_range(from, to);
        let entries: Vec<(String, MessageId)> = list_range_records(
            self.store.as_ref(),
            &self.index_ns,
            &start,
            &end,
            INDEX_KIND,
        )
        .await?;

        let mut admitted = 0;
        for (key, message_id) in entries {
            match self.admit_deferred(&message_id, &key).await {
                Ok(true) => admitted += 1,
                Ok(false) => {}
                Err(e) => {
                    // Records are kept; a later sweep or restart retries
                    error!(
                        message_id = %message_id,
                        "[idv-02] Failed to admit deferred message: {}",
                        e
                    );
                }
            }
        }

        if admitted > 0 {
            info!(from, to, admitted, "[idv-02] Deferred messages admitted");
        }
        Ok(admitted)
    }

    async fn recover(&self) -> BlockGateResult<usize> {
        let height = self.ledger.observed_height();
        let admitted = self.on_height_advanced(0, height).await?;
        info!(height, admitted, "[idv-02] Deferred messages recovered");
        Ok(admitted)
    }

    fn release_lock(&self, message_id: &MessageId) {
        self.locks.release(message_id);
    }

    async fn deferred_count(&self) -> BlockGateResult<usize> {
        Ok(self.store.list_all(&self.messages_ns).await?.len())
    }
}
