//! # Task Queue Service
//!
//! One runner (a spawned tokio task) per request id with waiting work. The
//! runner is started under the queue lock when the first task for an idle
//! key arrives, and exits under the same lock when the key's queue is empty,
//! so two runners for one key can never coexist.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_store::{list_records, put_record, DurableStore, Namespace, TASKS};
use shared_types::{
    now_millis, EventKind, GaugeCell, GaugeKind, MetricsObserver, RequestId, Task, TimerKind,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::config::TaskQueueConfig;
use crate::domain::{parse_task_key, task_key, KeyQueue, QueuedTask, TaskOutcome, TaskQueueError};
use crate::ports::{CompletionRegistry, TaskExecutor, TaskQueueApi};

const RECORD_KIND: &str = "task";

/// Per-key FIFO task queue with durable backing.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

struct Inner {
    config: TaskQueueConfig,
    ns: Namespace,
    store: Arc<dyn DurableStore>,
    executor: Arc<dyn TaskExecutor>,
    completions: Arc<CompletionRegistry>,
    metrics: Arc<dyn MetricsObserver>,
    queues: Mutex<HashMap<RequestId, KeyQueue>>,
    next_seq: AtomicU64,
    pending: GaugeCell,
    processing: GaugeCell,
    queued_keys: GaugeCell,
    idle: Notify,
}

impl TaskQueue {
    /// Create a queue. Call [`TaskQueueApi::recover`] before enqueuing new
    /// work so persisted tasks keep their place.
    pub fn new(
        config: TaskQueueConfig,
        store: Arc<dyn DurableStore>,
        executor: Arc<dyn TaskExecutor>,
        completions: Arc<CompletionRegistry>,
        metrics: Arc<dyn MetricsObserver>,
    ) -> Self {
        let ns = Namespace::new(TASKS, &config.node_id);
        Self {
            inner: Arc::new(Inner {
                ns,
                store,
                executor,
                completions,
                pending: GaugeCell::new(GaugeKind::PendingTasks, metrics.clone()),
                processing: GaugeCell::new(GaugeKind::ProcessingTasks, metrics.clone()),
                queued_keys: GaugeCell::new(GaugeKind::QueuedRequests, metrics.clone()),
                metrics,
                queues: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(1),
                idle: Notify::new(),
                config,
            }),
        }
    }

    /// Wait until every key queue has drained.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.queues.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Namespace holding this queue's persisted tasks.
    pub fn namespace(&self) -> &Namespace {
        &self.inner.ns
    }
}

#[async_trait]
impl TaskQueueApi for TaskQueue {
    async fn enqueue(&self, task: Task) -> Result<u64, TaskQueueError> {
        let inner = &self.inner;
        let request_id = task.request_id.clone();
        let seq = inner.next_seq.fetch_add(1, Ordering::SeqCst);

        put_record(
            inner.store.as_ref(),
            &inner.ns,
            &task_key(&request_id, seq),
            RECORD_KIND,
            &task,
        )
        .await?;
        inner.pending.inc();

        let start_runner = {
            let mut queues = inner.queues.lock();
            let fresh = !queues.contains_key(&request_id);
            queues
                .entry(request_id.clone())
                .or_default()
                .insert(QueuedTask { seq, task });
            fresh
        };

        debug!(
            request_id = %request_id,
            seq,
            start_runner,
            "[idv-01] Task enqueued"
        );

        if start_runner {
            inner.queued_keys.inc();
            spawn_runner(self.inner.clone(), request_id);
        }
        Ok(seq)
    }

    async fn recover(&self) -> Result<usize, TaskQueueError> {
        let inner = &self.inner;
        let records: Vec<(String, Task)> =
            list_records(inner.store.as_ref(), &inner.ns, RECORD_KIND).await?;

        let mut by_key: BTreeMap<RequestId, Vec<QueuedTask>> = BTreeMap::new();
        let mut max_seq = 0;
        for (key, task) in records {
            let (request_id, seq) = match parse_task_key(&key) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("[idv-01] Skipping persisted task: {}", e);
                    continue;
                }
            };
            max_seq = max_seq.max(seq);
            by_key
                .entry(request_id)
                .or_default()
                .push(QueuedTask { seq, task });
        }
        inner.next_seq.fetch_max(max_seq + 1, Ordering::SeqCst);

        let mut recovered = 0;
        for (request_id, tasks) in by_key {
            let count = tasks.len();
            let inserted = {
                let mut queues = inner.queues.lock();
                if queues.contains_key(&request_id) {
                    false
                } else {
                    queues.insert(request_id.clone(), KeyQueue::from_recovered(tasks));
                    true
                }
            };
            if !inserted {
                debug!(request_id = %request_id, "[idv-01] Key already live, not reloading");
                continue;
            }
            inner.pending.add(count as i64);
            inner.queued_keys.inc();
            recovered += count;
            spawn_runner(self.inner.clone(), request_id);
        }

        info!(recovered, "[idv-01] Persisted tasks recovered");
        Ok(recovered)
    }

    fn pending_count(&self) -> i64 {
        self.inner.pending.get()
    }

    fn processing_count(&self) -> i64 {
        self.inner.processing.get()
    }

    fn queued_keys(&self) -> Vec<RequestId> {
        let mut keys: Vec<_> = self.inner.queues.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn queue_len(&self, request_id: &RequestId) -> usize {
        self.inner
            .queues
            .lock()
            .get(request_id)
            .map_or(0, KeyQueue::len)
    }

    fn is_running(&self, request_id: &RequestId) -> bool {
        self.inner.queues.lock().contains_key(request_id)
    }
}

fn spawn_runner(inner: Arc<Inner>, request_id: RequestId) {
    tokio::spawn(run_key(inner, request_id));
}

/// Take the next waiting task for `request_id`, or discard the key's queue
/// if it is empty.
fn next_for_key(inner: &Inner, request_id: &RequestId) -> Option<QueuedTask> {
    let mut queues = inner.queues.lock();
    let queue = queues.get_mut(request_id)?;
    match queue.pop_front() {
        Some(next) => Some(next),
        None => {
            queues.remove(request_id);
            let now_empty = queues.is_empty();
            drop(queues);
            inner.queued_keys.dec();
            if now_empty {
                inner.idle.notify_waiters();
            }
            None
        }
    }
}

async fn run_key(inner: Arc<Inner>, request_id: RequestId) {
    while let Some(queued) = next_for_key(&inner, &request_id) {
        inner.pending.dec();
        inner.processing.inc();
        inner.metrics.on_timer(
            TimerKind::TaskPending,
            now_millis().saturating_sub(queued.task.enqueued_at),
        );

        let started = Instant::now();
        let outcome = execute_isolated(&inner, &queued.task).await;
        inner.processing.dec();

        if let TaskOutcome::Interrupted { reason } = &outcome {
            warn!(
                request_id = %request_id,
                seq = queued.seq,
                reason = %reason,
                "[idv-01] Task interrupted, re-running from persisted record"
            );
            tokio::time::sleep(inner.config.requeue_delay).await;
            inner.pending.inc();
            if let Some(queue) = inner.queues.lock().get_mut(&request_id) {
                queue.push_front(queued);
            }
            continue;
        }

        inner
            .metrics
            .on_timer(TimerKind::TaskProcess, started.elapsed().as_millis() as u64);
        match &outcome {
            TaskOutcome::Failure { cause } => {
                inner.metrics.on_event(EventKind::TaskProcessFail);
                warn!(
                    request_id = %request_id,
                    seq = queued.seq,
                    callback = %queued.task.callback,
                    "[idv-01] Task failed: {}",
                    cause
                );
            }
            _ => debug!(request_id = %request_id, seq = queued.seq, "[idv-01] Task done"),
        }

        run_completion(&inner, &queued.task, outcome).await;

        if let Err(e) = inner
            .store
            .delete(&inner.ns, &task_key(&request_id, queued.seq))
            .await
        {
            error!(
                request_id = %request_id,
                seq = queued.seq,
                "[idv-01] Failed to delete finished task record: {}",
                e
            );
        }
    }
    debug!(request_id = %request_id, "[idv-01] Key drained");
}

/// Run the executor in its own tokio task so a panicking callback is
/// reported as a failure instead of killing the key's runner.
async fn execute_isolated(inner: &Arc<Inner>, task: &Task) -> TaskOutcome {
    let executor = inner.executor.clone();
    let owned = task.clone();
    match tokio::spawn(async move { executor.execute(&owned).await }).await {
        Ok(outcome) => outcome,
        Err(e) => TaskOutcome::failure(format!("task execution aborted: {}", e)),
    }
}

async fn run_completion(inner: &Arc<Inner>, task: &Task, outcome: TaskOutcome) {
    let Some(handler_id) = task.on_finished.clone() else {
        return;
    };
    let Some(handler) = inner.completions.resolve(&handler_id) else {
        warn!(
            request_id = %task.request_id,
            handler = %handler_id,
            "[idv-01] Unknown completion handler, skipping"
        );
        return;
    };
    let owned = task.clone();
    let joined =
        tokio::spawn(async move { handler.on_finished(&owned, &outcome).await }).await;
    if let Err(e) = joined {
        error!(
            request_id = %task.request_id,
            handler = %handler_id,
            "[idv-01] Completion handler aborted: {}",
            e
        );
    }
}
