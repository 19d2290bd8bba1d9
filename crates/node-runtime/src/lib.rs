//! # Node Runtime Library
//!
//! Wiring of the IDV node engine. The main entry point is the `idv-node`
//! binary in `main.rs`; the library is exposed for embedding and tests.
//!
//! ## Flow
//!
//! ```text
//! peer message ──handle_inbound──→ BlockGate ──admit──→ TaskQueue ──→ Delegation ──→ function
//!                                      ↑                    │
//! ledger block ──HeightAdvanced────────┘                    └── on_finished: release_message_lock
//!
//! business logic ──deliver──→ DeliveryEngine ──POST w/ backoff──→ client application
//! ```
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and the wired engine
//! - `adapters/` - port implementations connecting subsystems
//! - `wiring/` - ledger event handler and master/worker links
//! - `handlers/` - built-in task functions
//! - `runtime.rs` - start-up recovery and graceful shutdown

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;
pub mod wiring;

pub use container::{Collaborators, EngineContainer, NodeConfig, NodeRole};
pub use runtime::{NodeRuntime, StartupReport};
