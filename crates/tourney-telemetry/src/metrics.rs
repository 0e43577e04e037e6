//! Prometheus metrics.
//!
//! The registry is an owned value handed to whoever serves `/metrics`; there
//! are no global statics. Subsystem counters live in their own stats structs
//! and are copied into gauges at scrape time from their serializable
//! snapshots, so a component never depends on this crate.
//!
//! Naming: `<namespace>_component_stat{component, stat}` for snapshots and
//! `<namespace>_http_requests_total{route, status}` for ingress traffic.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use serde_json::Value;

use crate::TelemetryError;

/// Owned metrics registry.
pub struct MetricsRegistry {
    registry: Registry,
    component_stats: IntGaugeVec,
    http_requests: IntCounterVec,
}

impl MetricsRegistry {
    /// Create and register all metric families under `namespace`.
    ///
    /// # Errors
    ///
    /// Fails only on an invalid namespace.
    pub fn new(namespace: &str) -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let component_stats = IntGaugeVec::new(
            Opts::new("component_stat", "Counter snapshot reported by a platform component")
                .namespace(namespace),
            &["component", "stat"],
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests served by route and status")
                .namespace(namespace),
            &["route", "status"],
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        registry
            .register(Box::new(component_stats.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        registry
            .register(Box::new(http_requests.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        Ok(Self {
            registry,
            component_stats,
            http_requests,
        })
    }

    /// Copy every top-level integer field of `snapshot` into the component gauge.
    pub fn record_snapshot<T: Serialize>(&self, component: &str, snapshot: &T) {
        let Ok(Value::Object(fields)) = serde_json::to_value(snapshot) else {
            tracing::warn!(component, "metrics snapshot is not a flat object, skipped");
            return;
        };
        for (stat, value) in fields {
            if let Some(n) = value.as_u64() {
                self.component_stats
                    .with_label_values(&[component, &stat])
                    .set(i64::try_from(n).unwrap_or(i64::MAX));
            }
        }
    }

    /// Count one HTTP request.
    pub fn record_http_request(&self, route: &str, status: u16) {
        self.http_requests
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Current value of a component gauge.
    #[must_use]
    pub fn component_stat(&self, component: &str, stat: &str) -> i64 {
        self.component_stats
            .with_label_values(&[component, stat])
            .get()
    }

    /// Prometheus text exposition of every registered family.
    ///
    /// # Errors
    ///
    /// Fails if encoding produces invalid UTF-8, which the text encoder never does.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}
