//! # Delegation Configuration

use std::time::Duration;

/// Where task callbacks run. Fixed for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// In the master process.
    Local,
    /// On connected worker processes.
    Delegated,
}

/// Delegation configuration.
#[derive(Clone, Debug)]
pub struct DelegationConfig {
    pub mode: ExecutionMode,

    /// How long the master waits for a worker's response.
    pub request_timeout: Duration,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Local,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl DelegationConfig {
    /// Delegated mode with a short timeout.
    pub fn for_testing() -> Self {
        Self {
            mode: ExecutionMode::Delegated,
            request_timeout: Duration::from_millis(500),
        }
    }
}
