//! # Delivery Engine
//!
//! ```text
//! deliver(retry) ──persist──→ attempt ──ok──────────────→ delete record, handler(Ok)
//!                               │ ├────body too large──→ delete record, handler(Err)
//!                               │ └─fail─→ predicate? ──no──→ delete record, handler(RetryVetoed)
//!                               │             │ (none) budget left? ──no──→ delete record, handler(TimedOut)
//!                               │             ↓
//!                               └──── sleep(backoff) ←── stop_all ──→ exit, record kept
//! ```
//!
//! A supplied retry predicate alone decides whether to keep going; the
//! timeout and deadline only apply to deliveries without one.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared_store::{
    get_record, list_records, put_record, DurableStore, Namespace, CALLBACK_RETRIES,
    PENDING_CALLBACKS,
};
use shared_types::{
    now_millis, CallbackId, EventKind, GaugeCell, GaugeKind, HandlerId, MetricsObserver,
    PendingCallback, RetryRecord, TimerKind,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::DeliveryConfig;
use crate::domain::{AttemptError, CallbackRequest, CallbackResponse, DeliveryOutcome, DeliveryResult};
use crate::error::{DeliveryError, DeliveryFailure};
use crate::ports::{
    CallbackDeliveryApi, CallbackTransport, DeliveryHandle, PredicateRegistry,
    ResponseHandlerRegistry,
};

const RETRY_KIND: &str = "retry record";
const DEADLINE_KIND: &str = "pending callback";

/// Retry-with-backoff callback delivery.
///
/// Cheap to clone; clones share state and the halt flag.
#[derive(Clone)]
pub struct DeliveryEngine {
    inner: Arc<Inner>,
}

struct Inner {
    config: DeliveryConfig,
    retries_ns: Namespace,
    deadlines_ns: Namespace,
    store: Arc<dyn DurableStore>,
    transport: Arc<dyn CallbackTransport>,
    predicates: Arc<PredicateRegistry>,
    handlers: Arc<ResponseHandlerRegistry>,
    metrics: Arc<dyn MetricsObserver>,
    pending: GaugeCell,
    halt: watch::Sender<bool>,
    in_flight: Mutex<HashSet<CallbackId>>,
    idle: Notify,
}

impl DeliveryEngine {
    pub fn new(
        config: DeliveryConfig,
        store: Arc<dyn DurableStore>,
        transport: Arc<dyn CallbackTransport>,
        predicates: Arc<PredicateRegistry>,
        handlers: Arc<ResponseHandlerRegistry>,
        metrics: Arc<dyn MetricsObserver>,
    ) -> Self {
        let (halt, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                retries_ns: Namespace::new(CALLBACK_RETRIES, &config.node_id),
                deadlines_ns: Namespace::new(PENDING_CALLBACKS, &config.node_id),
                store,
                transport,
                predicates,
                handlers,
                pending: GaugeCell::new(GaugeKind::PendingCallbacks, metrics.clone()),
                metrics,
                halt,
                in_flight: Mutex::new(HashSet::new()),
                idle: Notify::new(),
                config,
            }),
        }
    }

    /// Wait until no retry loop is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.in_flight.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Callback ids with a running retry loop.
    pub fn in_flight(&self) -> Vec<CallbackId> {
        let mut ids: Vec<_> = self.inner.in_flight.lock().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn retries_namespace(&self) -> &Namespace {
        &self.inner.retries_ns
    }

    pub fn deadlines_namespace(&self) -> &Namespace {
        &self.inner.deadlines_ns
    }
}

#[async_trait]
impl CallbackDeliveryApi for DeliveryEngine {
    async fn deliver(&self, request: CallbackRequest) -> Result<DeliveryHandle, DeliveryError> {
        let inner = &self.inner;
        let cb_id = request
            .cb_id
            .clone()
            .unwrap_or_else(|| CallbackId::new(Uuid::new_v4().to_string()));

        if !request.retry {
            let engine = inner.clone();
            let id = cb_id.clone();
            let join = tokio::spawn(async move { engine.single_attempt(&id, request).await });
            return Ok(DeliveryHandle::new(cb_id, join));
        }

        if !inner.in_flight.lock().insert(cb_id.clone()) {
            return Err(DeliveryError::AlreadyInFlight { cb_id });
        }
        let record = RetryRecord {
            cb_id: cb_id.clone(),
            endpoint: request.endpoint,
            body: request.body,
            should_retry: request.should_retry,
            response_handler: request.response_handler,
            deadline: request.deadline,
            created_at: now_millis(),
        };
        if let Err(e) = inner.persist(&record).await {
            inner.release(&cb_id);
            return Err(e);
        }

        if inner.is_halted() {
            inner.release(&cb_id);
            info!(cb_id = %cb_id, "[idv-04] Retries halted, callback kept for resumption");
            let join = tokio::spawn(async { DeliveryOutcome::Halted });
            return Ok(DeliveryHandle::new(cb_id, join));
        }

        debug!(cb_id = %cb_id, endpoint = %record.endpoint, "[idv-04] Retry delivery started");
        Ok(DeliveryHandle::new(cb_id, inner.start_loop(record)))
    }

    fn stop_all(&self) {
        self.inner.halt.send_replace(true);
        info!(
            in_flight = self.inner.in_flight.lock().len(),
            "[idv-04] All callback retries halted"
        );
    }

    fn is_halted(&self) -> bool {
        self.inner.is_halted()
    }

    async fn resume_pending(&self) -> Result<usize, DeliveryError> {
        let inner = &self.inner;
        if inner.is_halted() {
            info!("[idv-04] Retries halted, not resuming");
            return Ok(0);
        }

        let records: Vec<(String, RetryRecord)> =
            list_records(inner.store.as_ref(), &inner.retries_ns, RETRY_KIND).await?;
        let mut resumed = 0;
        for (_, mut record) in records {
            if !inner.in_flight.lock().insert(record.cb_id.clone()) {
                debug!(cb_id = %record.cb_id, "[idv-04] Already in flight, not resuming");
                continue;
            }
            if record.deadline.is_none() {
                match get_record::<PendingCallback>(
                    inner.store.as_ref(),
                    &inner.deadlines_ns,
                    record.cb_id.as_str(),
                    DEADLINE_KIND,
                )
                .await
                {
                    Ok(pending) => record.deadline = pending.map(|p| p.deadline),
                    Err(e) => warn!(
                        cb_id = %record.cb_id,
                        "[idv-04] Could not read pending deadline: {}",
                        e
                    ),
                }
            }
            // Detached; the loop reports through the response handler
            drop(inner.start_loop(record));
            resumed += 1;
        }

        info!(resumed, "[idv-04] Callback retries resumed");
        Ok(resumed)
    }

    fn pending_count(&self) -> i64 {
        self.inner.pending.get()
    }
}

impl Inner {
    fn is_halted(&self) -> bool {
        *self.halt.borrow()
    }

    fn release(&self, cb_id: &CallbackId) {
        let idle = {
            let mut in_flight = self.in_flight.lock();
            in_flight.remove(cb_id);
            in_flight.is_empty()
        };
        if idle {
            self.idle.notify_waiters();
        }
    }

    async fn persist(&self, record: &RetryRecord) -> Result<(), DeliveryError> {
        put_record(
            self.store.as_ref(),
            &self.retries_ns,
            record.cb_id.as_str(),
            RETRY_KIND,
            record,
        )
        .await?;
        if self.config.record_pending_deadlines {
            let budget = self.config.total_timeout.as_millis() as u64;
            let pending = PendingCallback {
                deadline: record
                    .deadline
                    .unwrap_or_else(|| record.created_at.saturating_add(budget)),
            };
            put_record(
                self.store.as_ref(),
                &self.deadlines_ns,
                record.cb_id.as_str(),
                DEADLINE_KIND,
                &pending,
            )
            .await?;
        }
        Ok(())
    }

    /// Spawn the retry loop. The caller has already marked `record` in flight.
    fn start_loop(self: &Arc<Self>, record: RetryRecord) -> JoinHandle<DeliveryOutcome> {
        self.pending.inc();
        let inner = self.clone();
        tokio::spawn(async move {
            let cb_id = record.cb_id.clone();
            let outcome = inner.retry_loop(record).await;
            inner.pending.dec();
            inner.release(&cb_id);
            outcome
        })
    }

    async fn retry_loop(&self, record: RetryRecord) -> DeliveryOutcome {
        let started = Instant::now();
        let mut halt = self.halt.subscribe();
        let mut attempts = 0u32;

        loop {
            let halted = *halt.borrow_and_update();
            if halted {
                info!(cb_id = %record.cb_id, attempts, "[idv-04] Retry loop halted");
                return DeliveryOutcome::Halted;
            }

            attempts += 1;
            let error = match self
                .attempt(&record.cb_id, &record.endpoint, &record.body, attempts)
                .await
            {
                Ok(response) => return self.finish(&record, Ok(response)).await,
                Err(AttemptError::BodyTooLarge { limit }) => {
                    return self
                        .finish(&record, Err(DeliveryFailure::BodyTooLarge { limit }))
                        .await
                }
                Err(error) => error,
            };

            let wait = self.config.backoff.delay(attempts);
            match self.ask_predicate(&record, attempts, &error).await {
                Some(false) => {
                    info!(cb_id = %record.cb_id, attempts, "[idv-04] Retry vetoed by predicate");
                    return self
                        .finish(&record, Err(DeliveryFailure::RetryVetoed { attempts }))
                        .await;
                }
                Some(true) => {}
                None => {
                    if self.past_budget(&record, started, wait) {
                        self.metrics.on_event(EventKind::CallbackTimedOut);
                        warn!(
                            cb_id = %record.cb_id,
                            attempts,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "[idv-04] Callback retry timed out"
                        );
                        return self
                            .finish(&record, Err(DeliveryFailure::TimedOut { attempts }))
                            .await;
                    }
                }
            }

            debug!(
                cb_id = %record.cb_id,
                attempts,
                wait_ms = wait.as_millis() as u64,
                "[idv-04] Backing off before next attempt"
            );
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = halt_raised(&mut halt) => {
                    info!(cb_id = %record.cb_id, attempts, "[idv-04] Backoff interrupted by halt");
                    return DeliveryOutcome::Halted;
                }
            }
        }
    }

    async fn attempt(
        &self,
        cb_id: &CallbackId,
        endpoint: &str,
        body: &Value,
        attempt: u32,
    ) -> Result<CallbackResponse, AttemptError> {
        let started = Instant::now();
        let result = self.transport.post(endpoint, body).await;
        match &result {
            Ok(response) => {
                self.metrics
                    .on_timer(TimerKind::Callback, started.elapsed().as_millis() as u64);
                debug!(
                    cb_id = %cb_id,
                    attempt,
                    status = response.status,
                    "[idv-04] Callback delivered"
                );
            }
            Err(e) => {
                self.metrics.on_event(EventKind::CallbackFail);
                warn!(
                    cb_id = %cb_id,
                    attempt,
                    endpoint = %endpoint,
                    "[idv-04] Callback attempt failed: {}",
                    e
                );
            }
        }
        result
    }

    /// `None` when there is no usable predicate.
    async fn ask_predicate(
        &self,
        record: &RetryRecord,
        attempts: u32,
        error: &AttemptError,
    ) -> Option<bool> {
        let id = record.should_retry.as_ref()?;
        match self.predicates.resolve(id) {
            Some(predicate) => Some(predicate.should_retry(record, attempts, error).await),
            None => {
                error!(
                    cb_id = %record.cb_id,
                    predicate = %id,
                    "[idv-04] Unknown retry predicate, falling back to timeout"
                );
                None
            }
        }
    }

    fn past_budget(&self, record: &RetryRecord, started: Instant, wait: Duration) -> bool {
        if started.elapsed() + wait > self.config.total_timeout {
            return true;
        }
        record
            .deadline
            .is_some_and(|deadline| now_millis().saturating_add(wait.as_millis() as u64) > deadline)
    }

    async fn finish(&self, record: &RetryRecord, result: DeliveryResult) -> DeliveryOutcome {
        let cb_id = record.cb_id.as_str();
        if let Err(e) = self.store.delete(&self.retries_ns, cb_id).await {
            error!(cb_id = %cb_id, "[idv-04] Failed to delete retry record: {}", e);
        }
        if let Err(e) = self.store.delete(&self.deadlines_ns, cb_id).await {
            error!(cb_id = %cb_id, "[idv-04] Failed to delete pending deadline: {}", e);
        }
        self.notify(record.response_handler.as_ref(), &record.cb_id, &result)
            .await;
        match result {
            Ok(response) => DeliveryOutcome::Delivered(response),
            Err(failure) => DeliveryOutcome::Failed(failure),
        }
    }

    async fn single_attempt(&self, cb_id: &CallbackId, request: CallbackRequest) -> DeliveryOutcome {
        let result = self
            .attempt(cb_id, &request.endpoint, &request.body, 1)
            .await
            .map_err(|e| match e {
                AttemptError::BodyTooLarge { limit } => DeliveryFailure::BodyTooLarge { limit },
                AttemptError::Transport(cause) => DeliveryFailure::Transport(cause),
            });
        self.notify(request.response_handler.as_ref(), cb_id, &result)
            .await;
        match result {
            Ok(response) => DeliveryOutcome::Delivered(response),
            Err(failure) => DeliveryOutcome::Failed(failure),
        }
    }

    async fn notify(&self, handler: Option<&HandlerId>, cb_id: &CallbackId, result: &DeliveryResult) {
        let Some(id) = handler else {
            return;
        };
        match self.handlers.resolve(id) {
            Some(handler) => handler.on_response(cb_id, result).await,
            None => warn!(
                cb_id = %cb_id,
                handler = %id,
                "[idv-04] Unknown response handler, outcome dropped"
            ),
        }
    }
}

/// Resolves once the halt flag is set.
async fn halt_raised(halt: &mut watch::Receiver<bool>) {
    loop {
        let raised = *halt.borrow_and_update();
        if raised {
            return;
        }
        if halt.changed().await.is_err() {
            // Sender gone: nobody can raise the flag any more
            std::future::pending::<()>().await;
        }
    }
}
