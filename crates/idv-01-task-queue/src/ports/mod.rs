//! # Ports Layer
//!
//! - `inbound.rs`: `TaskQueueApi`, what the rest of the node calls
//! - `outbound.rs`: `TaskExecutor`, `CompletionHandler`, what the queue needs

pub mod inbound;
pub mod outbound;

pub use inbound::TaskQueueApi;
pub use outbound::{
    CompletionHandler, CompletionRegistry, MockExecutor, RecordingCompletion, TaskExecutor,
};
