//! # IDV Engine Benchmarks
//!
//! | Component | Operation | Measured |
//! |-----------|-----------|----------|
//! | idv-01 Task Queue | enqueue + drain | tasks spread over request ids |
//! | idv-02 Block-Gate | defer + sweep | messages admitted per height advance |
//! | idv-04 Delivery | backoff schedule | delay computation per attempt |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use idv_01_task_queue::{
    CompletionRegistry, MockExecutor, TaskQueue, TaskQueueApi, TaskQueueConfig,
};
use idv_02_block_gate::{BlockGate, BlockGateApi, BlockGateConfig, MockLedger, RecordingAdmission};
use idv_04_callback_delivery::BackoffPolicy;
use serde_json::json;
use shared_store::InMemoryStore;
use shared_types::{HandlerId, InboundMessage, MessageId, NodeId, NoopMetrics, RequestId, Task};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// idv-01: Task Queue
// ============================================================================

fn bench_task_queue_drain(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("idv-01-task-queue");
    group.measurement_time(Duration::from_secs(10));

    for keys in [1usize, 10, 100] {
        let tasks = 1_000;
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::new("enqueue_and_drain", keys), &keys, |b, &keys| {
            b.iter(|| {
                rt.block_on(async {
                    let queue = TaskQueue::new(
                        TaskQueueConfig::for_testing("bench"),
                        Arc::new(InMemoryStore::new()),
                        Arc::new(MockExecutor::new()),
                        Arc::new(CompletionRegistry::new()),
                        Arc::new(NoopMetrics),
                    );
                    for i in 0..tasks {
                        let task = Task::new(
                            NodeId::from("bench"),
                            RequestId::from(format!("req-{}", i % keys)),
                            HandlerId::from("work"),
                            json!({ "label": i }),
                        );
                        queue.enqueue(task).await.unwrap();
                    }
                    queue.wait_idle().await;
                    black_box(queue.pending_count())
                })
            })
        });
    }

    group.finish();
}

// ============================================================================
// idv-02: Block-Gate
// ============================================================================

fn bench_gate_defer_and_sweep(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("idv-02-block-gate");
    let next_id = AtomicU64::new(0);

    for batch in [10u64, 100, 1_000] {
        group.throughput(Throughput::Elements(batch));
        group.bench_with_input(BenchmarkId::new("defer_then_sweep", batch), &batch, |b, &batch| {
            b.iter(|| {
                rt.block_on(async {
                    let ledger = Arc::new(MockLedger::new("bench-chain", 0));
                    let gate = BlockGate::new(
                        BlockGateConfig::for_testing("bench"),
                        Arc::new(InMemoryStore::new()),
                        ledger.clone(),
                        Arc::new(RecordingAdmission::new()),
                    );
                    let mut ids = Vec::with_capacity(batch as usize);
                    for height in 1..=batch {
                        let id = MessageId::from(format!(
                            "m-{}",
                            next_id.fetch_add(1, Ordering::Relaxed)
                        ));
                        gate.admit_or_defer(InboundMessage {
                            message_id: id.clone(),
                            request_id: RequestId::from("req-1"),
                            height,
                            chain_id: "bench-chain".to_string(),
                            sender_node_id: NodeId::from("idp"),
                            payload: json!({}),
                        })
                        .await
                        .unwrap();
                        ids.push(id);
                    }
                    ledger.set_height(batch);
                    let admitted = gate.on_height_advanced(0, batch).await.unwrap();
                    for id in &ids {
                        gate.release_lock(id);
                    }
                    black_box(admitted)
                })
            })
        });
    }

    group.finish();
}

// ============================================================================
// idv-04: Callback Delivery
// ============================================================================

fn bench_backoff_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("idv-04-callback-delivery");
    let policy = BackoffPolicy::default();

    group.bench_function("backoff_delay_first_20_attempts", |b| {
        b.iter(|| {
            let mut total = Duration::ZERO;
            for attempt in 1..=20 {
                total += policy.delay(black_box(attempt));
            }
            black_box(total)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_task_queue_drain,
    bench_gate_defer_and_sweep,
    bench_backoff_schedule,
);

criterion_main!(benches);
