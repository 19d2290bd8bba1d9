//! Telemetry configuration from environment variables.

use std::env;

use crate::TelemetryError;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error or a full directive)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Prometheus metrics port
    pub metrics_port: u16,

    /// Metric name prefix
    pub metrics_prefix: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "idv-node".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: 9100,
            metrics_prefix: "idv".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `IDV_SERVICE_NAME`: Service name (default: idv-node)
    /// - `IDV_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `IDV_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `IDV_METRICS_PORT`: Prometheus metrics port (default: 9100)
    pub fn from_env() -> Result<Self, TelemetryError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] over an arbitrary variable
    /// source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TelemetryError> {
        let defaults = Self::default();
        let in_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        let metrics_port = match lookup("IDV_METRICS_PORT") {
            None => defaults.metrics_port,
            Some(value) => value.parse().map_err(|e| {
                TelemetryError::Config(format!("IDV_METRICS_PORT '{}': {}", value, e))
            })?,
        };

        Ok(Self {
            service_name: lookup("IDV_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("IDV_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("IDV_JSON_LOGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(in_container),
            metrics_port,
            metrics_prefix: defaults.metrics_prefix,
        })
    }
}
