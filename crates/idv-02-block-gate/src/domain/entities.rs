//! # Domain Entities

use shared_store::height_key;
use shared_types::MessageId;

/// What the node knows about the ledger instance a message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// The ledger instance the node is currently following.
    Current,
    /// A ledger instance the node followed before a chain switch.
    Historical,
    /// Never seen.
    Unknown,
}

/// Result of [`crate::BlockGateApi::admit_or_defer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Handed to the task queue now.
    Admitted,
    /// Persisted until the observed height reaches the message height.
    Deferred,
    /// The message id is already admitted and its task not yet finished.
    AlreadyAdmitted,
}

/// Deferred index key: `{height:020}/{message_id}`.
///
/// Zero padding keeps a lexicographic range scan in height order.
pub fn index_key(height: u64, message_id: &MessageId) -> String {
    format!("{}/{}", height_key(height), message_id)
}

/// Half-open key range covering every index entry with
/// `from <= height <= to`.
pub fn index_range(from: u64, to: u64) -> (String, String) {
    let start = height_key(from);
    let end = match to.checked_add(1) {
        Some(next) => height_key(next),
        // '/' sorts below every digit, so this bounds all keys at u64::MAX
        None => format!("{}0", height_key(to)),
    };
    (start, end)
}
