//! # IDV-01 Per-Key Task Queue
//!
//! Serializes execution of tasks sharing a request id while allowing
//! unbounded parallelism across distinct request ids.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | At most one task per key executes at a time | `service.rs` - one runner per key, started under the queue lock |
//! | INVARIANT-2 | FIFO per key | `domain/entities.rs` - `KeyQueue::insert` keeps sequence order |
//! | INVARIANT-3 | Task N+1 starts only after task N's completion handler returned | `service.rs` - `run_key` loop |
//! | INVARIANT-4 | Persisted before runnable | `service.rs` - `enqueue` writes the record before touching memory |
//! | INVARIANT-5 | Empty key queues are discarded | `service.rs` - `next_for_key` |
//!
//! ## Task Lifecycle
//!
//! ```text
//! enqueue ──persist──→ [WAITING] ──head of key──→ [EXECUTING] ──outcome──→ on_finished ──→ record deleted
//!                                                      │
//!                                                      └── interrupted ──→ [WAITING] (head, record kept)
//! ```
//!
//! Execution failures do not halt the key: the completion handler runs and
//! the key advances. An *interrupted* execution (worker lost mid-task) keeps
//! the persisted record and re-runs the task, the same way start-up
//! recovery does.
//!
//! ## Module Structure
//!
//! ```text
//! idv-01-task-queue/
//! ├── domain/      # KeyQueue, QueuedTask, TaskOutcome, errors
//! ├── ports/       # TaskQueueApi (inbound), TaskExecutor + CompletionHandler (outbound)
//! ├── service.rs   # TaskQueue
//! └── config.rs    # TaskQueueConfig
//! ```

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::TaskQueueConfig;
pub use domain::{task_key, parse_task_key, KeyQueue, QueuedTask, TaskOutcome, TaskQueueError};
pub use ports::{
    CompletionHandler, CompletionRegistry, MockExecutor, RecordingCompletion, TaskExecutor,
    TaskQueueApi,
};
pub use service::TaskQueue;
