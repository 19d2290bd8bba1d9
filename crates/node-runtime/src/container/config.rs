//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Every subsystem config carries the node id; `NodeConfig::new` keeps them
//! consistent, so build through it rather than field by field.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use idv_01_task_queue::TaskQueueConfig;
use idv_02_block_gate::BlockGateConfig;
use idv_03_delegation::{DelegationConfig, ExecutionMode};
use idv_04_callback_delivery::DeliveryConfig;
use idv_telemetry::{TelemetryConfig, TelemetryError};
use shared_types::{HandlerId, NodeId};
use thiserror::Error;

/// Function that processes an admitted peer message.
pub const DEFAULT_MESSAGE_HANDLER: &str = "process_message";

/// Process role, fixed at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Owns durable state and executes tasks in-process.
    Standalone,
    /// Owns durable state; tasks run on connected workers.
    Master,
    /// Stateless; executes tasks for a master.
    Worker,
}

impl FromStr for NodeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standalone" => Ok(Self::Standalone),
            "master" => Ok(Self::Master),
            "worker" => Ok(Self::Worker),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    RocksDb,
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// RocksDB directory.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid telemetry configuration: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: NodeId,
    pub role: NodeRole,
    /// Ledger instance this node follows.
    pub chain_id: String,
    /// Function every admitted message is handed to.
    pub message_handler: HandlerId,
    /// Master: address workers connect to.
    pub worker_listen: SocketAddr,
    /// Worker: address of the master.
    pub master_addr: SocketAddr,
    /// Upper bound on waiting for the task queue to drain at shutdown.
    pub shutdown_grace: Duration,
    pub storage: StorageConfig,
    pub task_queue: TaskQueueConfig,
    pub block_gate: BlockGateConfig,
    pub delegation: DelegationConfig,
    pub delivery: DeliveryConfig,
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Defaults for `node_id` in `role`. Master nodes delegate execution.
    pub fn new(node_id: &str, role: NodeRole) -> Self {
        let node = NodeId::from(node_id);
        let mode = match role {
            NodeRole::Master => ExecutionMode::Delegated,
            NodeRole::Standalone | NodeRole::Worker => ExecutionMode::Local,
        };
        Self {
            role,
            chain_id: "idv-main".to_string(),
            message_handler: HandlerId::from(DEFAULT_MESSAGE_HANDLER),
            worker_listen: SocketAddr::from(([127, 0, 0, 1], 7400)),
            master_addr: SocketAddr::from(([127, 0, 0, 1], 7400)),
            shutdown_grace: Duration::from_secs(10),
            storage: StorageConfig::default(),
            task_queue: TaskQueueConfig {
                node_id: node.clone(),
                ..Default::default()
            },
            block_gate: BlockGateConfig {
                node_id: node.clone(),
            },
            delegation: DelegationConfig {
                mode,
                ..Default::default()
            },
            delivery: DeliveryConfig {
                node_id: node.clone(),
                record_pending_deadlines: role == NodeRole::Master,
                ..Default::default()
            },
            telemetry: TelemetryConfig::default(),
            node_id: node,
        }
    }

    /// Standalone node with short delays and an in-memory store.
    pub fn for_testing(node_id: &str) -> Self {
        Self {
            task_queue: TaskQueueConfig::for_testing(node_id),
            delivery: DeliveryConfig::for_testing(node_id),
            shutdown_grace: Duration::from_secs(1),
            ..Self::new(node_id, NodeRole::Standalone)
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `IDV_NODE_ID` | `node` | Namespace of all durable records |
    /// | `IDV_MODE` | `standalone` | `standalone`, `master` or `worker` |
    /// | `IDV_CHAIN_ID` | `idv-main` | Ledger instance followed |
    /// | `IDV_WORKER_LISTEN` | `127.0.0.1:7400` | Master listen address |
    /// | `IDV_MASTER_ADDR` | `127.0.0.1:7400` | Worker connect address |
    /// | `IDV_DATA_DIR` | unset | RocksDB directory; in-memory when unset |
    /// | `IDV_CALLBACK_TIMEOUT_SECS` | `600` | Total callback retry budget |
    /// | `IDV_TASK_TIMEOUT_SECS` | `120` | Delegated task response timeout |
    ///
    /// Logging and metrics variables are read by [`TelemetryConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`NodeConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_id = lookup("IDV_NODE_ID").unwrap_or_else(|| "node".to_string());
        let role = parse_var(&lookup, "IDV_MODE")?.unwrap_or(NodeRole::Standalone);
        let mut config = Self::new(&node_id, role);

        if let Some(chain_id) = lookup("IDV_CHAIN_ID") {
            config.chain_id = chain_id;
        }
        if let Some(addr) = parse_var(&lookup, "IDV_WORKER_LISTEN")? {
            config.worker_listen = addr;
        }
        if let Some(addr) = parse_var(&lookup, "IDV_MASTER_ADDR")? {
            config.master_addr = addr;
        }
        if let Some(dir) = lookup("IDV_DATA_DIR") {
            config.storage = StorageConfig {
                backend: StorageBackend::RocksDb,
                data_dir: PathBuf::from(dir),
            };
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "IDV_CALLBACK_TIMEOUT_SECS")? {
            config.delivery.total_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "IDV_TASK_TIMEOUT_SECS")? {
            config.delegation.request_timeout = Duration::from_secs(secs);
        }
        parse_var::<u16, _>(&lookup, "IDV_METRICS_PORT")?;
        config.telemetry = TelemetryConfig::from_lookup(&lookup)?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
                value,
            }),
    }
}
