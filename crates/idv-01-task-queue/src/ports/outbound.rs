//! # Outbound Ports
//!
//! Dependencies of the task queue: an executor (implemented by the
//! delegation layer) and completion handlers (implemented by business
//! logic, e.g. releasing a message lock).

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{HandlerRegistry, RequestId, Task};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::domain::TaskOutcome;

/// Executes a task's callback - outbound port.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run the task and report how it went. Must not panic on failure.
    async fn execute(&self, task: &Task) -> TaskOutcome;
}

/// Side effect run after a task finished, success or failure.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn on_finished(&self, task: &Task, outcome: &TaskOutcome);
}

/// Completion handlers by id.
pub type CompletionRegistry = HandlerRegistry<dyn CompletionHandler>;

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Executor driven by the task arguments.
///
/// Recognised fields of `callback_args`:
/// - `label` (string): name used in the event log
/// - `delay_ms` (number): simulated execution time
/// - `fail` (bool): return `Failure`
/// - `interrupt_times` (number): return `Interrupted` this many times first
#[derive(Default)]
pub struct MockExecutor {
    log: Mutex<Vec<String>>,
    in_flight: Mutex<HashMap<RequestId, usize>>,
    interrupts: Mutex<HashMap<String, u64>>,
    overlap_detected: AtomicBool,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `start:{label}` / `end:{label}` entries in execution order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// True if two tasks of one request id ever executed at the same time.
    pub fn overlap_detected(&self) -> bool {
        self.overlap_detected.load(Ordering::SeqCst)
    }

    fn label(task: &Task) -> String {
        task.callback_args
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or("?")
            .to_string()
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn execute(&self, task: &Task) -> TaskOutcome {
        let label = Self::label(task);
        {
            let mut in_flight = self.in_flight.lock();
            let n = in_flight.entry(task.request_id.clone()).or_insert(0);
            *n += 1;
            if *n > 1 {
                self.overlap_detected.store(true, Ordering::SeqCst);
            }
        }
        self.log.lock().push(format!("start:{}", label));

        let delay = task
            .callback_args
            .get("delay_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let interrupt_budget = task
            .callback_args
            .get("interrupt_times")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let interrupted = {
            let mut interrupts = self.interrupts.lock();
            let used = interrupts.entry(label.clone()).or_insert(0);
            if *used < interrupt_budget {
                *used += 1;
                true
            } else {
                false
            }
        };

        if let Some(n) = self.in_flight.lock().get_mut(&task.request_id) {
            *n -= 1;
        }
        self.log.lock().push(format!("end:{}", label));

        if interrupted {
            return TaskOutcome::interrupted("mock worker lost");
        }
        let fail = task
            .callback_args
            .get("fail")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if fail {
            TaskOutcome::failure(format!("{} failed", label))
        } else {
            TaskOutcome::Success(serde_json::Value::String(label))
        }
    }
}

/// Completion handler that records `on_finished_args` in call order.
#[derive(Default)]
pub struct RecordingCompletion {
    calls: Mutex<Vec<(serde_json::Value, bool)>>,
}

impl RecordingCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(on_finished_args, succeeded)` per call.
    pub fn calls(&self) -> Vec<(serde_json::Value, bool)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CompletionHandler for RecordingCompletion {
    async fn on_finished(&self, task: &Task, outcome: &TaskOutcome) {
        self.calls
            .lock()
            .push((task.on_finished_args.clone(), outcome.is_success()));
    }
}
