//! # Subsystem Container
//!
//! ## Initialization Order
//!
//! ```text
//! 1. Delegation       LocalExecutor | DelegatedExecutor      (functions)
//! 2. Task Queue       TaskQueue                              (store, executor, completions)
//! 3. Block-Gate       BlockGate                              (store, ledger, QueueAdmission → queue)
//! 4. Completions      release_message_lock                   (gate, weakly)
//! 5. Delivery         DeliveryEngine                         (store, transport, predicates, handlers)
//! ```
//!
//! The completion registry is populated after the gate exists because the
//! gate's admission path leads into the queue that calls the handler.

use std::sync::Arc;

use idv_01_task_queue::{CompletionHandler, CompletionRegistry, TaskQueue};
use idv_02_block_gate::{BlockGate, LedgerView};
use idv_03_delegation::{
    DelegatedExecutor, ExecutionMode, FunctionRegistry, LocalExecutor, TaskDelegation,
};
use idv_04_callback_delivery::{
    CallbackTransport, DeliveryEngine, PredicateRegistry, ResponseHandlerRegistry,
};
use shared_store::DurableStore;
use shared_types::MetricsObserver;
use tracing::info;

use crate::adapters::{DelegationExecutor, QueueAdmission, ReleaseMessageLock, RELEASE_MESSAGE_LOCK};
use crate::container::config::NodeConfig;

/// External collaborators the engine is built on.
pub struct Collaborators {
    pub store: Arc<dyn DurableStore>,
    pub ledger: Arc<dyn LedgerView>,
    pub transport: Arc<dyn CallbackTransport>,
    pub metrics: Arc<dyn MetricsObserver>,
    /// Task functions, also served to workers in delegated mode.
    pub functions: Arc<FunctionRegistry>,
    pub predicates: Arc<PredicateRegistry>,
    pub response_handlers: Arc<ResponseHandlerRegistry>,
    /// Extra completion handlers; `release_message_lock` is added here.
    pub completions: Arc<CompletionRegistry>,
}

/// The wired engine.
pub struct EngineContainer {
    pub config: NodeConfig,
    pub store: Arc<dyn DurableStore>,
    pub metrics: Arc<dyn MetricsObserver>,
    pub functions: Arc<FunctionRegistry>,
    pub completions: Arc<CompletionRegistry>,
    pub delegation: Arc<dyn TaskDelegation>,
    /// Present in delegated mode, for attaching workers.
    pub workers: Option<DelegatedExecutor>,
    pub queue: TaskQueue,
    pub gate: Arc<BlockGate>,
    pub delivery: DeliveryEngine,
}

impl EngineContainer {
    pub fn new(config: NodeConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            ledger,
            transport,
            metrics,
            functions,
            predicates,
            response_handlers,
            completions,
        } = collaborators;

        let (delegation, workers): (Arc<dyn TaskDelegation>, Option<DelegatedExecutor>) =
            match config.delegation.mode {
                ExecutionMode::Local => (Arc::new(LocalExecutor::new(functions.clone())), None),
                ExecutionMode::Delegated => {
                    let executor = DelegatedExecutor::new(config.delegation.clone());
                    (Arc::new(executor.clone()), Some(executor))
                }
            };
        info!(mode = ?config.delegation.mode, "[node] Delegation ready");

        let queue = TaskQueue::new(
            config.task_queue.clone(),
            store.clone(),
            Arc::new(DelegationExecutor::new(delegation.clone())),
            completions.clone(),
            metrics.clone(),
        );

        let admission = Arc::new(QueueAdmission::new(
            config.node_id.clone(),
            config.message_handler.clone(),
            Arc::new(queue.clone()),
        ));
        let gate = Arc::new(BlockGate::new(
            config.block_gate.clone(),
            store.clone(),
            ledger,
            admission,
        ));
        completions.register(
            RELEASE_MESSAGE_LOCK,
            Arc::new(ReleaseMessageLock::new(Arc::downgrade(&gate))) as Arc<dyn CompletionHandler>,
        );

        let delivery = DeliveryEngine::new(
            config.delivery.clone(),
            store.clone(),
            transport,
            predicates,
            response_handlers,
            metrics.clone(),
        );
        info!(node_id = %config.node_id, "[node] Engine assembled");

        Self {
            config,
            store,
            metrics,
            functions,
            completions,
            delegation,
            workers,
            queue,
            gate,
            delivery,
        }
    }
}
