//! Master/worker execution over in-process streams.

use super::harness::{eventually, TestNode, TestNodeBuilder};
use idv_01_task_queue::TaskQueueApi;
use idv_03_delegation::{
    DelegatedExecutor, DelegationConfig, DelegationRequest, FrameReader, WorkerRuntime,
};
use node_runtime::NodeRole;
use serde_json::json;
use shared_types::RequestId;
use tokio::sync::oneshot;

fn master() -> TestNode {
    TestNodeBuilder::new("rp-master")
        .configure(|config| {
            config.role = NodeRole::Master;
            config.delegation = DelegationConfig::for_testing();
        })
        .build()
}

/// Attach a worker that serves the node's own functions.
fn attach_worker(node: &TestNode, workers: &DelegatedExecutor) {
    let (master_side, worker_side) = tokio::io::duplex(64 * 1024);
    let (reader, writer) = tokio::io::split(master_side);
    workers.attach(reader, writer);

    let runtime = WorkerRuntime::new(node.runtime.container().functions.clone());
    tokio::spawn(async move {
        let (reader, writer) = tokio::io::split(worker_side);
        let _ = runtime.serve(reader, writer).await;
    });
}

/// Attach a worker that takes one request and disconnects without
/// answering. The received request is sent on the returned channel.
fn attach_vanishing_worker(workers: &DelegatedExecutor) -> oneshot::Receiver<DelegationRequest> {
    let (master_side, worker_side) = tokio::io::duplex(64 * 1024);
    let (reader, writer) = tokio::io::split(master_side);
    workers.attach(reader, writer);

    let (seen_tx, seen_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (reader, writer) = tokio::io::split(worker_side);
        let mut frames = FrameReader::new(reader);
        if let Ok(Some(request)) = frames.next_frame::<DelegationRequest>().await {
            let _ = seen_tx.send(request);
        }
        drop(writer);
    });
    seen_rx
}

#[tokio::test]
async fn test_delegated_tasks_keep_per_key_order() {
    let node = master();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();
    let workers = engine.workers.clone().unwrap();
    attach_worker(&node, &workers);
    attach_worker(&node, &workers);

    engine.queue.enqueue(TestNode::work("req-1", "T1", 50)).await.unwrap();
    engine.queue.enqueue(TestNode::work("req-1", "T2", 10)).await.unwrap();
    engine.queue.wait_idle().await;

    assert_eq!(
        node.log.entries(),
        vec!["start:T1", "end:T1", "start:T2", "end:T2"]
    );
    assert_eq!(node.completed(), vec!["T1", "T2"]);
    assert_eq!(workers.in_flight(), 0);
}

#[tokio::test]
async fn test_task_reruns_after_worker_loss() {
    let node = master();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();
    let workers = engine.workers.clone().unwrap();

    let seen = attach_vanishing_worker(&workers);
    engine.queue.enqueue(TestNode::work("req-1", "T1", 0)).await.unwrap();

    let request = seen.await.unwrap();
    assert_eq!(request.args["label"], json!("T1"));
    eventually(|| workers.worker_count() == 0).await;
    assert!(node.completed().is_empty());

    attach_worker(&node, &workers);
    engine.queue.wait_idle().await;

    assert_eq!(node.log.count("start:T1"), 1);
    assert_eq!(node.completed(), vec!["T1"]);
    assert!(node.store.is_empty(engine.queue.namespace()));
}

#[tokio::test]
async fn test_task_waits_for_first_worker() {
    let node = master();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();
    let workers = engine.workers.clone().unwrap();

    engine.queue.enqueue(TestNode::work("req-1", "T1", 0)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(node.completed().is_empty());
    assert!(engine.queue.is_running(&RequestId::from("req-1")));

    attach_worker(&node, &workers);
    engine.queue.wait_idle().await;
    assert_eq!(node.completed(), vec!["T1"]);
}

#[tokio::test]
async fn test_worker_failure_is_not_rerun() {
    let node = master();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();
    attach_worker(&node, engine.workers.as_ref().unwrap());

    let mut failing = TestNode::work("req-1", "F", 0);
    failing.callback_args["fail"] = json!(true);
    engine.queue.enqueue(failing).await.unwrap();
    engine.queue.wait_idle().await;

    assert_eq!(node.log.count("start:F"), 1);
    assert_eq!(node.completions.calls(), vec![(json!("F"), false)]);
}

#[tokio::test]
async fn test_silent_worker_times_out_as_failure() {
    let node = master();
    node.runtime.start().await.unwrap();
    let engine = node.runtime.container();
    let workers = engine.workers.clone().unwrap();

    let (master_side, worker_side) = tokio::io::duplex(64 * 1024);
    let (reader, writer) = tokio::io::split(master_side);
    workers.attach(reader, writer);
    tokio::spawn(async move {
        let (reader, _writer) = tokio::io::split(worker_side);
        let mut frames = FrameReader::new(reader);
        while let Ok(Some(_)) = frames.next_frame::<DelegationRequest>().await {}
    });

    engine.queue.enqueue(TestNode::work("req-1", "T1", 0)).await.unwrap();
    engine.queue.wait_idle().await;

    assert_eq!(node.completions.calls(), vec![(json!("T1"), false)]);
    assert_eq!(workers.worker_count(), 1);
    assert_eq!(workers.in_flight(), 0);
}
