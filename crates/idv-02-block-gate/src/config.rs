//! # Block-Gate Configuration

use shared_types::NodeId;

/// Block-gate configuration.
#[derive(Clone, Debug)]
pub struct BlockGateConfig {
    /// Node whose namespaces hold the deferred messages.
    pub node_id: NodeId,
}

impl Default for BlockGateConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::from("node"),
        }
    }
}

impl BlockGateConfig {
    pub fn for_testing(node_id: &str) -> Self {
        Self {
            node_id: NodeId::from(node_id),
        }
    }
}
