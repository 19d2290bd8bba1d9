//! # Engine Container
//!
//! Configuration plus the wired engine: store, metrics, registries and the
//! four subsystems, built once in dependency order.

pub mod config;
pub mod subsystems;

pub use config::{
    ConfigError, NodeConfig, NodeRole, StorageBackend, StorageConfig, DEFAULT_MESSAGE_HANDLER,
};
pub use subsystems::{Collaborators, EngineContainer};
