//! # Task Queue Configuration

use shared_types::NodeId;
use std::time::Duration;

/// Task queue configuration.
#[derive(Clone, Debug)]
pub struct TaskQueueConfig {
    /// Node whose namespace holds the persisted tasks.
    pub node_id: NodeId,

    /// Delay before re-running a task whose execution was interrupted.
    pub requeue_delay: Duration,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::from("node"),
            requeue_delay: Duration::from_secs(1),
        }
    }
}

impl TaskQueueConfig {
    /// Create a config for testing (short delays).
    pub fn for_testing(node_id: &str) -> Self {
        Self {
            node_id: NodeId::from(node_id),
            requeue_delay: Duration::from_millis(10),
        }
    }
}
