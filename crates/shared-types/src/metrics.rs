//! # Metrics Observer Port
//!
//! Engine components report through `MetricsObserver`, injected as
//! `Arc<dyn MetricsObserver>`. The telemetry crate provides a Prometheus
//! implementation; `InMemoryMetrics` records everything for tests.
//!
//! ## Metric Names
//!
//! | Kind | Name |
//! |------|------|
//! | Gauge | `pendingTasksInQueueCount`, `processingTasksCount`, `requestsInQueueCount`, `pendingCallbacksCount` |
//! | Timer | `taskPendingTime`, `taskProcessTime`, `callbackTime` |
//! | Event | `taskProcessFail`, `callbackFail`, `callbackTimedOut` |

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide counters that move up and down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GaugeKind {
    PendingTasks,
    ProcessingTasks,
    QueuedRequests,
    PendingCallbacks,
}

impl GaugeKind {
    pub const ALL: [GaugeKind; 4] = [
        GaugeKind::PendingTasks,
        GaugeKind::ProcessingTasks,
        GaugeKind::QueuedRequests,
        GaugeKind::PendingCallbacks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GaugeKind::PendingTasks => "pendingTasksInQueueCount",
            GaugeKind::ProcessingTasks => "processingTasksCount",
            GaugeKind::QueuedRequests => "requestsInQueueCount",
            GaugeKind::PendingCallbacks => "pendingCallbacksCount",
        }
    }
}

/// Latency measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    TaskPending,
    TaskProcess,
    Callback,
}

impl TimerKind {
    pub const ALL: [TimerKind; 3] = [TimerKind::TaskPending, TimerKind::TaskProcess, TimerKind::Callback];

    pub fn name(self) -> &'static str {
        match self {
            TimerKind::TaskPending => "taskPendingTime",
            TimerKind::TaskProcess => "taskProcessTime",
            TimerKind::Callback => "callbackTime",
        }
    }
}

/// Discrete failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TaskProcessFail,
    CallbackFail,
    CallbackTimedOut,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::TaskProcessFail,
        EventKind::CallbackFail,
        EventKind::CallbackTimedOut,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::TaskProcessFail => "taskProcessFail",
            EventKind::CallbackFail => "callbackFail",
            EventKind::CallbackTimedOut => "callbackTimedOut",
        }
    }
}

/// Observer notified of every metric change.
pub trait MetricsObserver: Send + Sync {
    /// A gauge moved to `value`.
    fn on_counter_change(&self, gauge: GaugeKind, value: i64);

    /// A duration was measured.
    fn on_timer(&self, timer: TimerKind, duration_ms: u64);

    /// A failure event happened.
    fn on_event(&self, event: EventKind);
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsObserver for NoopMetrics {
    fn on_counter_change(&self, _gauge: GaugeKind, _value: i64) {}
    fn on_timer(&self, _timer: TimerKind, _duration_ms: u64) {}
    fn on_event(&self, _event: EventKind) {}
}

/// Observer that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    gauges: Mutex<HashMap<GaugeKind, Vec<i64>>>,
    timers: Mutex<HashMap<TimerKind, Vec<u64>>>,
    events: Mutex<HashMap<EventKind, u64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported value of a gauge (0 if never reported).
    pub fn gauge(&self, gauge: GaugeKind) -> i64 {
        self.gauges
            .lock()
            .get(&gauge)
            .and_then(|v| v.last().copied())
            .unwrap_or(0)
    }

    /// Every value a gauge has taken, in order.
    pub fn gauge_history(&self, gauge: GaugeKind) -> Vec<i64> {
        self.gauges.lock().get(&gauge).cloned().unwrap_or_default()
    }

    /// Timer samples in order.
    pub fn timer_samples(&self, timer: TimerKind) -> Vec<u64> {
        self.timers.lock().get(&timer).cloned().unwrap_or_default()
    }

    /// Number of times an event fired.
    pub fn event_count(&self, event: EventKind) -> u64 {
        self.events.lock().get(&event).copied().unwrap_or(0)
    }
}

impl MetricsObserver for InMemoryMetrics {
    fn on_counter_change(&self, gauge: GaugeKind, value: i64) {
        self.gauges.lock().entry(gauge).or_default().push(value);
    }

    fn on_timer(&self, timer: TimerKind, duration_ms: u64) {
        self.timers.lock().entry(timer).or_default().push(duration_ms);
    }

    fn on_event(&self, event: EventKind) {
        *self.events.lock().entry(event).or_insert(0) += 1;
    }
}

/// Gauge that forwards every change to an observer.
///
/// The observer is called while the value lock is held, so it sees the
/// values in the order they were produced.
pub struct GaugeCell {
    kind: GaugeKind,
    value: Mutex<i64>,
    observer: Arc<dyn MetricsObserver>,
}

impl GaugeCell {
    pub fn new(kind: GaugeKind, observer: Arc<dyn MetricsObserver>) -> Self {
        Self {
            kind,
            value: Mutex::new(0),
            observer,
        }
    }

    pub fn inc(&self) -> i64 {
        self.add(1)
    }

    pub fn dec(&self) -> i64 {
        self.add(-1)
    }

    pub fn add(&self, delta: i64) -> i64 {
        let mut value = self.value.lock();
        *value += delta;
        self.observer.on_counter_change(self.kind, *value);
        *value
    }

    pub fn get(&self) -> i64 {
        *self.value.lock()
    }
}
