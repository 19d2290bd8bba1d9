//! # IDV Telemetry
//!
//! Observability for the IDV node engine.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with env filter, pretty or JSON output
//! - **Metrics**: `PrometheusObserver`, the production `MetricsObserver`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use idv_telemetry::{init_logging, PrometheusObserver, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env()?;
//! init_logging(&config)?;
//! let metrics = Arc::new(PrometheusObserver::new(&config.metrics_prefix)?);
//! // hand `metrics` to the engine components as `Arc<dyn MetricsObserver>`
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `IDV_SERVICE_NAME` | `idv-node` | Service name in logs |
//! | `IDV_LOG_LEVEL` | `info` | Log level filter |
//! | `IDV_JSON_LOGS` | `false` | JSON log output |
//! | `IDV_METRICS_PORT` | `9100` | Prometheus port |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::PrometheusObserver;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
