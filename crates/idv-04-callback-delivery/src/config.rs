//! # Delivery Configuration

use shared_types::NodeId;
use std::time::Duration;

use crate::domain::BackoffPolicy;

/// Response bodies above this size abort the read (3 MiB).
pub const MAX_RESPONSE_BYTES: usize = 3 * 1024 * 1024;

/// Delivery engine configuration.
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    /// Node whose namespaces hold the retry records.
    pub node_id: NodeId,

    pub backoff: BackoffPolicy,

    /// Give up when the next wait would end past this budget, counted from
    /// the first attempt. Not applied when a retry predicate is supplied.
    pub total_timeout: Duration,

    pub max_response_bytes: usize,

    /// Per-attempt HTTP timeout.
    pub request_timeout: Duration,

    /// Also write each retry delivery's absolute deadline to the
    /// `pending_callbacks` table.
    pub record_pending_deadlines: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::from("node"),
            backoff: BackoffPolicy::default(),
            total_timeout: Duration::from_secs(600),
            max_response_bytes: MAX_RESPONSE_BYTES,
            request_timeout: Duration::from_secs(60),
            record_pending_deadlines: false,
        }
    }
}

impl DeliveryConfig {
    /// Deterministic, fast backoff: 100ms doubling to 1s, no jitter, 1s
    /// budget.
    pub fn for_testing(node_id: &str) -> Self {
        Self {
            node_id: NodeId::from(node_id),
            backoff: BackoffPolicy {
                initial: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(1),
                jitter: 0.0,
            },
            total_timeout: Duration::from_secs(1),
            max_response_bytes: MAX_RESPONSE_BYTES,
            request_timeout: Duration::from_secs(5),
            record_pending_deadlines: false,
        }
    }
}
