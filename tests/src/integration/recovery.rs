//! Restart behaviour: a second node on the same store picks up where the
//! first one stopped.

use super::harness::{eventually, TestNode, TestNodeBuilder, RECORD, WORK};
use idv_01_task_queue::TaskQueueApi;
use idv_02_block_gate::{AdmissionDecision, BlockGateApi};
use idv_03_delegation::{function, FunctionRegistry};
use idv_04_callback_delivery::{CallbackDeliveryApi, CallbackRequest, ScriptedTransport};
use serde_json::{json, Value};
use shared_store::InMemoryStore;
use shared_types::MessageId;
use std::sync::Arc;

/// `work` that never returns, standing in for a process that died mid-task.
fn hanging_functions() -> FunctionRegistry {
    let functions = FunctionRegistry::new();
    functions.register(
        WORK,
        function(|_args: Value| async move {
            std::future::pending::<Result<Value, String>>().await
        }),
    );
    functions
}

#[tokio::test(start_paused = true)]
async fn test_tasks_resume_in_order_after_crash() {
    let store = Arc::new(InMemoryStore::new());

    let crashed = TestNodeBuilder::new("rp-1")
        .store(store.clone())
        .functions(hanging_functions())
        .build();
    crashed.runtime.start().await.unwrap();
    let engine = crashed.runtime.container();
    engine.queue.enqueue(TestNode::work("req-1", "T1", 20)).await.unwrap();
    engine.queue.enqueue(TestNode::work("req-1", "T2", 20)).await.unwrap();
    engine.queue.enqueue(TestNode::work("req-2", "U1", 20)).await.unwrap();
    eventually(|| engine.queue.processing_count() == 2).await;
    assert_eq!(store.len(engine.queue.namespace()), 3);

    let restarted = TestNodeBuilder::new("rp-1").store(store.clone()).build();
    let report = restarted.runtime.start().await.unwrap();
    assert_eq!(report.tasks_recovered, 3);

    let engine = restarted.runtime.container();
    engine.queue.wait_idle().await;

    let entries = restarted.log.entries();
    let position = |e: &str| entries.iter().position(|x| x == e).unwrap();
    assert!(position("end:T1") < position("start:T2"));
    assert_eq!(restarted.log.count("start:U1"), 1);
    let mut completed = restarted.completed();
    completed.sort();
    assert_eq!(completed, vec!["T1", "T2", "U1"]);
    assert!(store.is_empty(engine.queue.namespace()));
}

#[tokio::test(start_paused = true)]
async fn test_recover_twice_does_not_duplicate() {
    let store = Arc::new(InMemoryStore::new());
    let crashed = TestNodeBuilder::new("rp-1")
        .store(store.clone())
        .functions(hanging_functions())
        .build();
    crashed.runtime.start().await.unwrap();
    let engine = crashed.runtime.container();
    engine.queue.enqueue(TestNode::work("req-1", "T1", 100)).await.unwrap();

    let restarted = TestNodeBuilder::new("rp-1").store(store.clone()).build();
    restarted.runtime.start().await.unwrap();
    let engine = restarted.runtime.container();
    assert_eq!(engine.queue.recover().await.unwrap(), 0);
    engine.queue.wait_idle().await;

    assert_eq!(restarted.log.count("start:T1"), 1);
    assert_eq!(restarted.completed(), vec!["T1"]);
}

#[tokio::test(start_paused = true)]
async fn test_halted_callback_resumes_on_restart() {
    let store = Arc::new(InMemoryStore::new());

    let first = TestNodeBuilder::new("rp-1")
        .store(store.clone())
        .transport(ScriptedTransport::always_fail())
        .build();
    first.runtime.start().await.unwrap();
    let handle = first
        .runtime
        .deliver(
            CallbackRequest::new("http://rp.local/cb", json!({"status": "verified"}))
                .with_retry()
                .with_cb_id("cb-1")
                .with_response_handler(RECORD),
        )
        .await
        .unwrap();
    eventually(|| first.transport.attempts() >= 2).await;
    first.runtime.shutdown().await;
    handle.outcome().await;
    assert!(first.responses.calls().is_empty());

    let second = TestNodeBuilder::new("rp-1").store(store.clone()).build();
    let report = second.runtime.start().await.unwrap();
    assert_eq!(report.callbacks_resumed, 1);

    let engine = second.runtime.container();
    engine.delivery.wait_idle().await;
    assert_eq!(second.transport.attempts(), 1);
    assert_eq!(
        second.transport.requests()[0].1,
        json!({"status": "verified"})
    );
    let calls = second.responses.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.is_ok());
    assert!(store.is_empty(engine.delivery.retries_namespace()));
    assert_eq!(engine.delivery.resume_pending().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deferred_message_survives_restart() {
    let store = Arc::new(InMemoryStore::new());

    let first = TestNodeBuilder::new("rp-1")
        .store(store.clone())
        .height(100)
        .build();
    first.runtime.start().await.unwrap();
    let decision = first
        .runtime
        .handle_inbound(TestNode::message("m-1", "req-1", 105))
        .await
        .unwrap();
    assert_eq!(decision, AdmissionDecision::Deferred);
    first.runtime.shutdown().await;

    let second = TestNodeBuilder::new("rp-1")
        .store(store.clone())
        .height(110)
        .build();
    let report = second.runtime.start().await.unwrap();
    assert_eq!(report.messages_admitted, 1);

    let engine = second.runtime.container();
    engine.queue.wait_idle().await;
    eventually(|| !engine.gate.locks().is_held(&MessageId::from("m-1"))).await;
    assert_eq!(second.log.entries(), vec!["start:m-1", "end:m-1"]);
    assert_eq!(engine.gate.deferred_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deferred_message_still_waits_after_restart() {
    let store = Arc::new(InMemoryStore::new());

    let first = TestNodeBuilder::new("rp-1")
        .store(store.clone())
        .height(100)
        .build();
    first.runtime.start().await.unwrap();
    first
        .runtime
        .handle_inbound(TestNode::message("m-1", "req-1", 120))
        .await
        .unwrap();

    let second = TestNodeBuilder::new("rp-1")
        .store(store.clone())
        .height(110)
        .build();
    let report = second.runtime.start().await.unwrap();
    assert_eq!(report.messages_admitted, 0);

    second.ledger.advance_to(120);
    eventually(|| second.log.count("end:m-1") == 1).await;
    let engine = second.runtime.container();
    engine.queue.wait_idle().await;
    assert_eq!(engine.gate.deferred_count().await.unwrap(), 0);
}
