//! Telemetry configuration from environment variables.

use std::env;

/// Logging and trace-export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name for traces and logs.
    pub service_name: String,

    /// OTLP gRPC endpoint for span export.
    pub otlp_endpoint: String,

    /// Export spans over OTLP. Off by default so a bare process needs no collector.
    pub otlp_enabled: bool,

    /// `EnvFilter` directive (`info`, `tm_01_standings=debug,info`, ...).
    pub log_level: String,

    /// JSON log lines instead of human-readable output.
    pub json_logs: bool,

    /// Deployment environment attached to exported spans.
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tournament-platform".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_enabled: false,
            log_level: "info".to_string(),
            json_logs: false,
            environment: "development".to_string(),
        }
    }
}

fn flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: service name (default: tournament-platform)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint; setting it also
    ///   enables export unless `TM_OTLP_ENABLED` says otherwise
    /// - `TM_OTLP_ENABLED`: force export on or off
    /// - `TM_LOG_LEVEL` or `RUST_LOG`: filter directive (default: info)
    /// - `TM_JSON_LOGS`: JSON output (default: true inside containers)
    /// - `TM_ENVIRONMENT`: deployment environment (default: development)
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            otlp_enabled: env::var("TM_OTLP_ENABLED")
                .map(|v| flag(&v))
                .unwrap_or(endpoint.is_some()),
            otlp_endpoint: endpoint.unwrap_or(defaults.otlp_endpoint),
            log_level: env::var("TM_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: env::var("TM_JSON_LOGS")
                .map(|v| flag(&v))
                .unwrap_or(is_container),
            environment: env::var("TM_ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Same configuration under a different service name.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}
