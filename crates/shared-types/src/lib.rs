//! # Shared Types Crate
//!
//! Domain entities, the typed handler registry and the metrics observer port
//! used across all engine subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Identifiers, not closures**: Records crossing a persistence or
//!   delegation boundary reference behaviour by `HandlerId` only. The
//!   concrete function is resolved through a `HandlerRegistry` populated
//!   at process start.
//! - **Injected observability**: Subsystems report metrics through the
//!   `MetricsObserver` trait and never touch a telemetry backend directly.

pub mod entities;
pub mod errors;
pub mod metrics;
pub mod registry;

pub use entities::*;
pub use errors::*;
pub use metrics::{
    EventKind, GaugeCell, GaugeKind, InMemoryMetrics, MetricsObserver, NoopMetrics, TimerKind,
};
pub use registry::{HandlerId, HandlerRegistry};
