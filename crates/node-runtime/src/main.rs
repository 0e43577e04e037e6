//! # Tournament Platform Node
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logs, optional OTLP span export)
//! 2. Load configuration (defaults → `TM_CONFIG` file → environment)
//! 3. Wire subsystems in dependency order
//! 4. Start the event subscriber and the HTTP server
//! 5. Ctrl+C triggers a graceful shutdown of both

use anyhow::{Context, Result};
use shared_bus::ShutdownSignal;
use tourney_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

use node_runtime::{NodeConfig, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(&TelemetryConfig::from_env())
        .context("initializing telemetry")?;

    let config = NodeConfig::load().context("loading configuration")?;
    let runtime = NodeRuntime::new(config)?;

    let (trigger, signal) = ShutdownSignal::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => warn!(error = %e, "cannot listen for Ctrl+C, shutting down"),
        }
        trigger.trigger();
    });

    runtime.run(signal).await
}
