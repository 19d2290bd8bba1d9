//! Prometheus metrics for the engine.
//!
//! All metrics follow the naming convention: `{prefix}_{engine_name}` where
//! `engine_name` is the camelCase name reported by the engine, converted to
//! snake_case (e.g. `idv_pending_tasks_in_queue_count`).
//!
//! ## Metric Types
//!
//! - **Gauge**: queue depth and in-flight counts
//! - **Histogram**: task pending/processing time, callback time (seconds)
//! - **Counter**: task and callback failures

use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry,
    TextEncoder,
};
use shared_types::{EventKind, GaugeKind, MetricsObserver, TimerKind};
use std::collections::HashMap;

use crate::TelemetryError;

/// `MetricsObserver` backed by an owned Prometheus registry.
pub struct PrometheusObserver {
    registry: Registry,
    gauges: HashMap<GaugeKind, IntGauge>,
    timers: HashMap<TimerKind, Histogram>,
    events: HashMap<EventKind, IntCounter>,
}

impl PrometheusObserver {
    /// Create and register every engine metric.
    pub fn new(prefix: &str) -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        let mut gauges = HashMap::new();
        let mut timers = HashMap::new();
        let mut events = HashMap::new();

        for kind in GaugeKind::ALL {
            let gauge = IntGauge::new(metric_name(prefix, kind.name()), kind.name())
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            registry
                .register(Box::new(gauge.clone()))
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            gauges.insert(kind, gauge);
        }

        for kind in TimerKind::ALL {
            let buckets = exponential_buckets(0.001, 2.0, 18)
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let histogram = Histogram::with_opts(
                HistogramOpts::new(
                    format!("{}_seconds", metric_name(prefix, kind.name())),
                    kind.name(),
                )
                .buckets(buckets),
            )
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            registry
                .register(Box::new(histogram.clone()))
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            timers.insert(kind, histogram);
        }

        for kind in EventKind::ALL {
            let counter = IntCounter::new(
                format!("{}_total", metric_name(prefix, kind.name())),
                kind.name(),
            )
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            registry
                .register(Box::new(counter.clone()))
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            events.insert(kind, counter);
        }

        Ok(Self {
            registry,
            gauges,
            timers,
            events,
        })
    }

    /// The underlying registry, for exposition.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

impl MetricsObserver for PrometheusObserver {
    fn on_counter_change(&self, gauge: GaugeKind, value: i64) {
        if let Some(g) = self.gauges.get(&gauge) {
            g.set(value);
        }
    }

    fn on_timer(&self, timer: TimerKind, duration_ms: u64) {
        if let Some(h) = self.timers.get(&timer) {
            h.observe(duration_ms as f64 / 1000.0);
        }
    }

    fn on_event(&self, event: EventKind) {
        if let Some(c) = self.events.get(&event) {
            c.inc();
        }
    }
}

/// `pendingTasksInQueueCount` -> `{prefix}_pending_tasks_in_queue_count`
fn metric_name(prefix: &str, camel: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + camel.len() + 8);
    out.push_str(prefix);
    out.push('_');
    for c in camel.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
