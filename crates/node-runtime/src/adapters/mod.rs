//! # Adapter Implementations
//!
//! Concrete adapters that implement one subsystem's outbound port on top of
//! another subsystem's inbound port:
//!
//! ```text
//! BlockGate ──MessageAdmission──→ QueueAdmission ──→ TaskQueue
//! TaskQueue ──TaskExecutor──────→ DelegationExecutor ──→ Local/DelegatedExecutor
//! TaskQueue ──CompletionHandler─→ ReleaseMessageLock ──→ BlockGate
//! ```
//!
//! plus the node-level collaborators: ledger view, store selection and the
//! admin endpoint.

pub mod admin;
pub mod admission;
pub mod executor;
pub mod ledger;
pub mod storage;

pub use admin::{admin_router, serve_admin};
pub use admission::{QueueAdmission, ReleaseMessageLock, RELEASE_MESSAGE_LOCK};
pub use executor::DelegationExecutor;
pub use ledger::{HeightAdvanced, InMemoryLedger};
pub use storage::open_store;
