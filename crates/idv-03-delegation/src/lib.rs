//! # IDV-03 Delegation Protocol
//!
//! Routes a task's callback to an in-process function (standalone) or to a
//! worker process (master/worker), and brings the result back.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Modes
//!
//! The mode is chosen once at start-up and never mixed:
//!
//! ```text
//! Local:      TaskQueue ──→ LocalExecutor ──→ FunctionRegistry
//!
//! Delegated:  TaskQueue ──→ DelegatedExecutor ══ JSON lines ══→ WorkerRuntime ──→ FunctionRegistry
//!                               ↑                                    │
//!                               └──── DelegationResponse{correlation_id} ┘
//! ```
//!
//! ## Worker Loss
//!
//! Workers own no durable state. When a link closes, every request still
//! waiting on it fails with `WorkerLost`. The task queue treats that as an
//! interruption and re-runs the task from its persisted record, the same
//! path used after a master restart.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{FrameReader, FrameWriter};
pub use config::{DelegationConfig, ExecutionMode};
pub use domain::{
    function, CorrelationId, DelegationRequest, DelegationResponse, FnFunction, FunctionRegistry,
    PendingRequests, TaskFunction, WorkerId,
};
pub use error::{DelegationError, DelegationResult};
pub use ports::TaskDelegation;
pub use service::{invoke, DelegatedExecutor, LocalExecutor, WorkerRuntime};
