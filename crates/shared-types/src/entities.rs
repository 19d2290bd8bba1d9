//! # Core Domain Entities
//!
//! Entities that flow between the block-gate, the task queue, the delegation
//! layer and the callback delivery engine.
//!
//! ## Clusters
//!
//! - **Identity**: `NodeId`, `RequestId`, `MessageId`, `CallbackId`
//! - **Work**: `Task`
//! - **Inbound**: `InboundMessage`, `DeferredMessage`
//! - **Delivery**: `RetryRecord`, `PendingCallback`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::registry::HandlerId;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a node in the verification network.
    NodeId
);
string_id!(
    /// Request identifier. Tasks sharing a request id are serialized.
    RequestId
);
string_id!(
    /// Identifier of an inbound peer message.
    MessageId
);
string_id!(
    /// Identifier of a single callback delivery.
    CallbackId
);

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// =============================================================================
// WORK
// =============================================================================

/// A unit of deferred work bound to a request id.
///
/// Identity is the position in its key's queue; the task queue assigns a
/// sequence number when it persists the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Node that owns the durable state for this task.
    pub owner_node_id: NodeId,
    /// Key the task is serialized against.
    pub request_id: RequestId,
    /// Function executed by the delegation layer.
    pub callback: HandlerId,
    /// Arguments passed to `callback`.
    pub callback_args: Value,
    /// Completion handler invoked after execution, success or failure.
    pub on_finished: Option<HandlerId>,
    /// Arguments passed to `on_finished`.
    pub on_finished_args: Value,
    /// Enqueue timestamp (ms since epoch).
    pub enqueued_at: u64,
}

impl Task {
    /// Create a task with no completion handler.
    pub fn new(
        owner_node_id: NodeId,
        request_id: RequestId,
        callback: HandlerId,
        callback_args: Value,
    ) -> Self {
        Self {
            owner_node_id,
            request_id,
            callback,
            callback_args,
            on_finished: None,
            on_finished_args: Value::Null,
            enqueued_at: now_millis(),
        }
    }

    /// Attach a completion handler.
    #[must_use]
    pub fn with_on_finished(mut self, handler: HandlerId, args: Value) -> Self {
        self.on_finished = Some(handler);
        self.on_finished_args = args;
        self
    }
}

// =============================================================================
// INBOUND
// =============================================================================

/// A message received from a peer node.
///
/// The engine reads only the routing metadata; `payload` is opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub request_id: RequestId,
    /// Ledger height the sender observed when it sent the message.
    pub height: u64,
    pub chain_id: String,
    pub sender_node_id: NodeId,
    pub payload: Value,
}

/// A message waiting for the local ledger view to reach its height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredMessage {
    pub message_id: MessageId,
    pub height: u64,
    /// Node that deferred the message.
    pub node_id: NodeId,
    pub raw_message: InboundMessage,
}

// =============================================================================
// DELIVERY
// =============================================================================

/// Persisted state of a callback delivery with retry semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryRecord {
    pub cb_id: CallbackId,
    pub endpoint: String,
    pub body: Value,
    /// Predicate consulted after each failed attempt.
    pub should_retry: Option<HandlerId>,
    /// Handler told about the terminal outcome.
    pub response_handler: Option<HandlerId>,
    /// Absolute deadline (ms since epoch).
    pub deadline: Option<u64>,
    pub created_at: u64,
}

/// Deadline companion entry written for deliveries started on behalf of a
/// delegated worker, so the master can resume them with the remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCallback {
    pub deadline: u64,
}
