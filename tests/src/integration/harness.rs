//! Test node assembly.
//!
//! `TestNode` is a `NodeRuntime` built from the production container with
//! in-memory collaborators and recording handlers:
//!
//! | Registry | Id | Behaviour |
//! |----------|----|-----------|
//! | functions | `work`, `process_message` | log `start:`/`end:` around `delay_ms`, fail on `fail` |
//! | completions | `record` | `RecordingCompletion` |
//! | predicates | `never`, `always` | `FixedPredicate` |
//! | response handlers | `record` | `RecordingResponseHandler` |

use idv_01_task_queue::{CompletionHandler, CompletionRegistry, RecordingCompletion};
use idv_03_delegation::{function, FunctionRegistry};
use idv_04_callback_delivery::{
    FixedPredicate, PredicateRegistry, RecordingResponseHandler, ResponseHandler,
    ResponseHandlerRegistry, RetryPredicate, ScriptedTransport,
};
use node_runtime::adapters::InMemoryLedger;
use node_runtime::container::{Collaborators, NodeConfig, DEFAULT_MESSAGE_HANDLER};
use node_runtime::NodeRuntime;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_store::InMemoryStore;
use shared_types::{HandlerId, InMemoryMetrics, InboundMessage, MessageId, NodeId, RequestId, Task};
use std::sync::Arc;
use std::time::Duration;

pub const CHAIN: &str = "chain-a";
pub const WORK: &str = "work";
pub const RECORD: &str = "record";

/// `start:{label}` / `end:{label}` entries across all executions.
#[derive(Default)]
pub struct ExecutionLog {
    entries: Mutex<Vec<String>>,
}

impl ExecutionLog {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }
}

/// `work` and `process_message`, both driven by `label`, `delay_ms` and
/// `fail` (read from `payload` for admitted messages).
pub fn logging_functions(log: Arc<ExecutionLog>) -> FunctionRegistry {
    let functions = FunctionRegistry::new();
    for id in [WORK, DEFAULT_MESSAGE_HANDLER] {
        let log = log.clone();
        functions.register(
            id,
            function(move |args: Value| {
                let log = log.clone();
                async move {
                    let fields = args.get("payload").cloned().unwrap_or(args);
                    let label = fields["label"].as_str().unwrap_or("?").to_string();
                    log.push(format!("start:{}", label));
                    let delay = fields["delay_ms"].as_u64().unwrap_or(0);
                    if delay > 0 {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                    log.push(format!("end:{}", label));
                    if fields["fail"].as_bool().unwrap_or(false) {
                        Err::<Value, _>(format!("{} failed", label))
                    } else {
                        Ok(json!(label))
                    }
                }
            }),
        );
    }
    functions
}

pub struct TestNode {
    pub runtime: NodeRuntime,
    pub ledger: Arc<InMemoryLedger>,
    pub store: Arc<InMemoryStore>,
    pub transport: Arc<ScriptedTransport>,
    pub metrics: Arc<InMemoryMetrics>,
    pub log: Arc<ExecutionLog>,
    pub completions: Arc<RecordingCompletion>,
    pub responses: Arc<RecordingResponseHandler>,
}

pub struct TestNodeBuilder {
    config: NodeConfig,
    store: Arc<InMemoryStore>,
    transport: ScriptedTransport,
    height: u64,
    functions: Option<FunctionRegistry>,
}

impl TestNodeBuilder {
    pub fn new(node_id: &str) -> Self {
        let mut config = NodeConfig::for_testing(node_id);
        config.chain_id = CHAIN.to_string();
        Self {
            config,
            store: Arc::new(InMemoryStore::new()),
            transport: ScriptedTransport::new(),
            height: 0,
            functions: None,
        }
    }

    /// Share a store with an earlier node (restart).
    pub fn store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = store;
        self
    }

    pub fn transport(mut self, transport: ScriptedTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut NodeConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Replace the logging functions.
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn build(self) -> TestNode {
        let log = Arc::new(ExecutionLog::default());
        let functions = self
            .functions
            .unwrap_or_else(|| logging_functions(log.clone()));

        let completions = Arc::new(RecordingCompletion::new());
        let completion_registry = Arc::new(CompletionRegistry::new());
        completion_registry.register(RECORD, completions.clone() as Arc<dyn CompletionHandler>);

        let predicates = Arc::new(PredicateRegistry::new());
        predicates.register(
            "never",
            Arc::new(FixedPredicate::new(false)) as Arc<dyn RetryPredicate>,
        );
        predicates.register(
            "always",
            Arc::new(FixedPredicate::new(true)) as Arc<dyn RetryPredicate>,
        );

        let responses = Arc::new(RecordingResponseHandler::new());
        let response_handlers = Arc::new(ResponseHandlerRegistry::new());
        response_handlers.register(RECORD, responses.clone() as Arc<dyn ResponseHandler>);

        let ledger = Arc::new(InMemoryLedger::new(&self.config.chain_id, self.height));
        let transport = Arc::new(self.transport);
        let metrics = Arc::new(InMemoryMetrics::new());

        let collaborators = Collaborators {
            store: self.store.clone(),
            ledger: ledger.clone(),
            transport: transport.clone(),
            metrics: metrics.clone(),
            functions: Arc::new(functions),
            predicates,
            response_handlers,
            completions: completion_registry,
        };
        let runtime = NodeRuntime::new(self.config, collaborators, ledger.subscribe());

        TestNode {
            runtime,
            ledger,
            store: self.store,
            transport,
            metrics,
            log,
            completions,
            responses,
        }
    }
}

impl TestNode {
    /// `work` task labelled `label`, completed through `record`.
    pub fn work(request_id: &str, label: &str, delay_ms: u64) -> Task {
        Task::new(
            NodeId::from("rp-1"),
            RequestId::from(request_id),
            HandlerId::from(WORK),
            json!({ "label": label, "delay_ms": delay_ms }),
        )
        .with_on_finished(HandlerId::from(RECORD), json!(label))
    }

    /// Peer message on [`CHAIN`] processed under `label`.
    pub fn message(id: &str, request_id: &str, height: u64) -> InboundMessage {
        InboundMessage {
            message_id: MessageId::from(id),
            request_id: RequestId::from(request_id),
            height,
            chain_id: CHAIN.to_string(),
            sender_node_id: NodeId::from("idp-1"),
            payload: json!({ "label": id }),
        }
    }

    /// Labels passed to the `record` completion handler, in call order.
    pub fn completed(&self) -> Vec<String> {
        self.completions
            .calls()
            .into_iter()
            .map(|(args, _)| args.as_str().unwrap_or("?").to_string())
            .collect()
    }
}

/// Poll `condition` until it holds; panics after ~5s.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
