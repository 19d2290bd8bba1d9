//! Namespaces scope records by kind and owning node.

use shared_types::NodeId;
use std::fmt;

/// Persisted tasks of the per-key task queue.
pub const TASKS: &str = "tasks";
/// Raw payloads of messages deferred by the block-gate.
pub const DEFERRED_MESSAGES: &str = "deferred_messages";
/// Height-ordered index of deferred message ids.
pub const DEFERRED_INDEX: &str = "deferred_index";
/// Callback deliveries with retry semantics.
pub const CALLBACK_RETRIES: &str = "callback_retries";
/// Deadlines of deliveries started for delegated workers.
pub const PENDING_CALLBACKS: &str = "pending_callbacks";

/// A record namespace, rendered as `{kind}:{node_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(kind: &str, node_id: &NodeId) -> Self {
        Self(format!("{}:{}", kind, node_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zero-padded height so lexicographic order equals numeric order.
pub fn height_key(height: u64) -> String {
    format!("{:020}", height)
}
