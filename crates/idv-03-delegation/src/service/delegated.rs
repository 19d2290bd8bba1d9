//! Master side of the delegation protocol.
//!
//! Each attached worker link gets two tokio tasks: a writer draining the
//! link's outbox and a response pump feeding [`PendingRequests`]. Whichever
//! notices the link is gone detaches the worker and fails its outstanding
//! requests with `WorkerLost`.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::Task;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::adapters::{FrameReader, FrameWriter};
use crate::config::{DelegationConfig, ExecutionMode};
use crate::domain::{DelegationRequest, DelegationResponse, PendingRequests, WorkerId};
use crate::error::{DelegationError, DelegationResult};
use crate::ports::TaskDelegation;

#[derive(Clone)]
struct WorkerHandle {
    id: WorkerId,
    outbox: mpsc::UnboundedSender<DelegationRequest>,
}

struct Inner {
    config: DelegationConfig,
    pending: PendingRequests,
    workers: RwLock<Vec<WorkerHandle>>,
    next_worker: AtomicUsize,
    next_worker_id: AtomicU64,
}

impl Inner {
    /// Round-robin over attached workers.
    fn pick_worker(&self) -> Option<WorkerHandle> {
        let workers = self.workers.read();
        if workers.is_empty() {
            return None;
        }
        let index = self.next_worker.fetch_add(1, Ordering::Relaxed) % workers.len();
        Some(workers[index].clone())
    }

    fn is_attached(&self, worker: WorkerId) -> bool {
        self.workers.read().iter().any(|w| w.id == worker)
    }

    fn worker_lost(&self, worker: WorkerId) {
        let removed = {
            let mut workers = self.workers.write();
            let before = workers.len();
            workers.retain(|w| w.id != worker);
            before != workers.len()
        };
        if removed {
            let failed = self.pending.fail_worker(worker);
            warn!(
                worker = %worker,
                failed,
                "[idv-03] Worker link closed, outstanding tasks will be re-run"
            );
        }
    }
}

/// Executor that sends tasks to worker processes.
#[derive(Clone)]
pub struct DelegatedExecutor {
    inner: Arc<Inner>,
}

impl DelegatedExecutor {
    pub fn new(config: DelegationConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                pending: PendingRequests::new(),
                workers: RwLock::new(Vec::new()),
                next_worker: AtomicUsize::new(0),
                next_worker_id: AtomicU64::new(1),
            }),
        }
    }

    /// Attach a worker reachable over `reader`/`writer`.
    pub fn attach<R, W>(&self, reader: R, writer: W) -> WorkerId
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id = WorkerId(self.inner.next_worker_id.fetch_add(1, Ordering::SeqCst));
        let (outbox, mut requests) = mpsc::unbounded_channel::<DelegationRequest>();
        self.inner.workers.write().push(WorkerHandle { id, outbox });
        info!(worker = %id, "[idv-03] Worker attached");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut frames = FrameWriter::new(writer);
            while let Some(request) = requests.recv().await {
                if let Err(e) = frames.send(&request).await {
                    warn!(worker = %id, "[idv-03] Failed to write to worker: {}", e);
                    break;
                }
            }
            inner.worker_lost(id);
        });

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut frames = FrameReader::new(reader);
            loop {
                match frames.next_frame::<DelegationResponse>().await {
                    Ok(Some(response)) => {
                        inner.pending.complete(response);
                    }
                    Ok(None) => break,
                    Err(DelegationError::Codec(e)) => {
                        warn!(worker = %id, "[idv-03] Dropping malformed response: {}", e);
                    }
                    Err(e) => {
                        warn!(worker = %id, "[idv-03] Worker link failed: {}", e);
                        break;
                    }
                }
            }
            inner.worker_lost(id);
        });

        id
    }

    /// Detach a worker as if its link had closed.
    pub fn detach(&self, worker: WorkerId) {
        self.inner.worker_lost(worker);
    }

    pub fn worker_count(&self) -> usize {
        self.inner.workers.read().len()
    }

    /// Requests waiting for a worker's response.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.len()
    }
}

#[async_trait]
impl TaskDelegation for DelegatedExecutor {
    async fn execute(&self, task: &Task) -> DelegationResult<Value> {
        let inner = &self.inner;
        let worker = inner
            .pick_worker()
            .ok_or(DelegationError::NoWorkerAvailable)?;

        let (correlation_id, response) = inner.pending.register(worker.id, &task.callback);
        // A link that closed before registration would never fail this request
        if !inner.is_attached(worker.id) {
            inner.pending.cancel(&correlation_id);
            return Err(DelegationError::WorkerLost { worker: worker.id });
        }

        let request = DelegationRequest {
            correlation_id,
            function: task.callback.clone(),
            args: task.callback_args.clone(),
        };
        if worker.outbox.send(request).is_err() {
            inner.pending.cancel(&correlation_id);
            return Err(DelegationError::WorkerLost { worker: worker.id });
        }
        debug!(
            request_id = %task.request_id,
            function = %task.callback,
            worker = %worker.id,
            correlation_id = %correlation_id,
            "[idv-03] Task delegated"
        );

        match tokio::time::timeout(inner.config.request_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DelegationError::WorkerLost { worker: worker.id }),
            Err(_) => {
                inner.pending.cancel(&correlation_id);
                let after_ms = inner.config.request_timeout.as_millis() as u64;
                warn!(
                    request_id = %task.request_id,
                    worker = %worker.id,
                    after_ms,
                    "[idv-03] Delegated task timed out"
                );
                Err(DelegationError::Timeout { after_ms })
            }
        }
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Delegated
    }
}
