//! End-to-end flows through a standalone node.

use super::harness::{eventually, TestNode, TestNodeBuilder, RECORD};
use idv_01_task_queue::TaskQueueApi;
use idv_02_block_gate::{AdmissionDecision, BlockGateApi};
use idv_04_callback_delivery::{
    CallbackDeliveryApi, CallbackRequest, DeliveryFailure, DeliveryOutcome, ScriptedTransport,
};
use serde_json::json;
use shared_types::{EventKind, GaugeKind, MessageId};

#[tokio::test(start_paused = true)]
async fn test_same_request_id_tasks_run_in_order() {
    let node = TestNodeBuilder::new("rp-1").build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();

    engine.queue.enqueue(TestNode::work("req-1", "T1", 200)).await.unwrap();
    engine.queue.enqueue(TestNode::work("req-1", "T2", 50)).await.unwrap();
    engine.queue.wait_idle().await;

    assert_eq!(
        node.log.entries(),
        vec!["start:T1", "end:T1", "start:T2", "end:T2"]
    );
    assert_eq!(node.completed(), vec!["T1", "T2"]);
    assert!(node
        .metrics
        .gauge_history(GaugeKind::PendingTasks)
        .ends_with(&[2, 1, 0]));
    assert!(node.store.is_empty(engine.queue.namespace()));
}

#[tokio::test(start_paused = true)]
async fn test_distinct_request_ids_overlap() {
    let node = TestNodeBuilder::new("rp-1").build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();

    engine.queue.enqueue(TestNode::work("req-1", "A", 100)).await.unwrap();
    engine.queue.enqueue(TestNode::work("req-2", "B", 100)).await.unwrap();
    let started = tokio::time::Instant::now();
    engine.queue.wait_idle().await;

    assert!(started.elapsed() < std::time::Duration::from_millis(200));
    assert_eq!(node.completed().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_task_still_advances_key() {
    let node = TestNodeBuilder::new("rp-1").build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();

    let mut failing = TestNode::work("req-1", "F", 10);
    failing.callback_args["fail"] = json!(true);
    engine.queue.enqueue(failing).await.unwrap();
    engine.queue.enqueue(TestNode::work("req-1", "next", 10)).await.unwrap();
    engine.queue.wait_idle().await;

    let calls = node.completions.calls();
    assert_eq!(calls, vec![(json!("F"), false), (json!("next"), true)]);
    assert_eq!(node.metrics.event_count(EventKind::TaskProcessFail), 1);
}

#[tokio::test(start_paused = true)]
async fn test_callback_retries_until_delivered() {
    let node = TestNodeBuilder::new("rp-1")
        .transport(ScriptedTransport::new().fail_times(2))
        .build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();

    let handle = node
        .runtime
        .deliver(
            CallbackRequest::new("http://rp.local/cb", json!({"status": "verified"}))
                .with_retry()
                .with_response_handler(RECORD),
        )
        .await
        .unwrap();
    assert_eq!(
        node.store.keys(engine.delivery.retries_namespace()),
        vec![handle.cb_id.to_string()]
    );

    let cb_id = handle.cb_id.clone();
    let outcome = handle.outcome().await;
    assert!(outcome.is_delivered());
    assert_eq!(node.transport.attempts(), 3);

    let calls = node.responses.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, cb_id);
    assert!(calls[0].1.is_ok());
    assert!(node.store.is_empty(engine.delivery.retries_namespace()));
    assert_eq!(node.metrics.event_count(EventKind::CallbackFail), 2);
    assert_eq!(engine.delivery.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_callback_predicate_veto_stops_after_one_attempt() {
    let node = TestNodeBuilder::new("rp-1")
        .transport(ScriptedTransport::always_fail())
        .build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();

    let outcome = node
        .runtime
        .deliver(
            CallbackRequest::new("http://rp.local/cb", json!({}))
                .with_retry()
                .with_should_retry("never")
                .with_response_handler(RECORD),
        )
        .await
        .unwrap()
        .outcome()
        .await;

    assert_eq!(
        outcome,
        DeliveryOutcome::Failed(DeliveryFailure::RetryVetoed { attempts: 1 })
    );
    assert_eq!(node.transport.attempts(), 1);
    assert!(node.store.is_empty(engine.delivery.retries_namespace()));
    assert!(node.responses.calls()[0].1.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_message_deferred_until_height_observed() {
    let node = TestNodeBuilder::new("rp-1").height(100).build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();
    let message_id = MessageId::from("m-1");

    let decision = node
        .runtime
        .handle_inbound(TestNode::message("m-1", "req-1", 105))
        .await
        .unwrap();
    assert_eq!(decision, AdmissionDecision::Deferred);
    assert_eq!(engine.gate.deferred_count().await.unwrap(), 1);

    node.ledger.advance_to(103);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(node.log.count("start:m-1"), 0);
    assert_eq!(engine.gate.deferred_count().await.unwrap(), 1);

    // Ledger event plus two direct notifications for the same range
    node.ledger.advance_to(105);
    let (a, b) = tokio::join!(
        node.runtime.on_new_block(101, 105),
        node.runtime.on_new_block(104, 105),
    );
    assert!(a.unwrap() + b.unwrap() <= 1);

    eventually(|| node.log.count("end:m-1") == 1).await;
    engine.queue.wait_idle().await;
    eventually(|| !engine.gate.locks().is_held(&message_id)).await;

    assert_eq!(node.log.count("start:m-1"), 1);
    assert_eq!(engine.gate.deferred_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_message_covered_by_height_runs_immediately() {
    let node = TestNodeBuilder::new("rp-1").height(100).build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();

    let decision = node
        .runtime
        .handle_inbound(TestNode::message("m-1", "req-1", 90))
        .await
        .unwrap();
    assert_eq!(decision, AdmissionDecision::Admitted);

    engine.queue.wait_idle().await;
    assert_eq!(node.log.entries(), vec!["start:m-1", "end:m-1"]);
    assert!(!engine.gate.locks().is_held(&MessageId::from("m-1")));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_halts_callbacks_and_drains_queue() {
    let node = TestNodeBuilder::new("rp-1")
        .transport(ScriptedTransport::always_fail())
        .build();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();

    engine.queue.enqueue(TestNode::work("req-1", "T1", 100)).await.unwrap();
    let handle = node
        .runtime
        .deliver(CallbackRequest::new("http://rp.local/cb", json!({})).with_retry())
        .await
        .unwrap();

    assert!(node.runtime.shutdown().await);
    assert_eq!(handle.outcome().await, DeliveryOutcome::Halted);
    assert!(engine.delivery.is_halted());
    assert_eq!(node.store.len(engine.delivery.retries_namespace()), 1);
    assert_eq!(node.completed(), vec!["T1"]);
}
