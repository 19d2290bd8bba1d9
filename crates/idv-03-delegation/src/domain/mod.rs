//! # Domain Layer
//!
//! - `protocol.rs`: wire messages between master and worker
//! - `pending.rs`: correlation-id to waiting caller map
//! - `function.rs`: task functions and their registry

pub mod function;
pub mod pending;
pub mod protocol;

pub use function::{function, FnFunction, FunctionRegistry, TaskFunction};
pub use pending::PendingRequests;
pub use protocol::{CorrelationId, DelegationRequest, DelegationResponse, WorkerId};
