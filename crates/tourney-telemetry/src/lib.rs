//! # Tourney Telemetry
//!
//! Observability for the tournament platform.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an env filter and pretty or JSON output
//! - **Traces**: optional OpenTelemetry OTLP export of `tracing` spans
//! - **Metrics**: an owned Prometheus registry fed from component snapshots
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config)?;
//! let metrics = MetricsRegistry::new("tm")?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `tournament-platform` | Service name in logs and traces |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `http://localhost:4317` | OTLP collector |
//! | `TM_OTLP_ENABLED` | set when an endpoint is given | Span export switch |
//! | `TM_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `TM_JSON_LOGS` | `true` in containers | JSON log lines |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::MetricsRegistry;
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Install logging and, when configured, span export.
///
/// Hold the returned guard for the life of the process; dropping it flushes
/// pending spans.
///
/// # Errors
///
/// Fails on an invalid filter directive, an exporter that cannot be built,
/// or when a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing = tracing_setup::init_tracing(config)?;
    Ok(TelemetryGuard { tracing })
}

/// Keeps telemetry active. Drop to flush and shut down.
pub struct TelemetryGuard {
    tracing: TracingGuard,
}

impl TelemetryGuard {
    #[must_use]
    pub fn exporting_spans(&self) -> bool {
        self.tracing.exporting()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("shutting down telemetry");
    }
}
