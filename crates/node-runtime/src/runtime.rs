//! # Node Runtime
//!
//! Owns the subsystem container and drives its long-running tasks: the event
//! subscriber and the HTTP server. Both stop on the same [`ShutdownSignal`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use shared_bus::ShutdownSignal;
use tracing::{error, info, warn};

use crate::container::{NodeConfig, SubsystemContainer};
use crate::http;

/// How long the subscriber gets to wind down after the server stops.
const SUBSCRIBER_DRAIN: Duration = Duration::from_secs(5);

/// Main node runtime.
pub struct NodeRuntime {
    container: Arc<SubsystemContainer>,
}

impl NodeRuntime {
    /// Wire every subsystem from `config`.
    ///
    /// # Errors
    ///
    /// Container wiring failures.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let container = SubsystemContainer::new(config).context("wiring subsystems")?;
        Ok(Self::from_container(container))
    }

    #[must_use]
    pub fn from_container(container: SubsystemContainer) -> Self {
        Self {
            container: Arc::new(container),
        }
    }

    #[must_use]
    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }

    /// The HTTP surface, for serving or for in-process requests.
    #[must_use]
    pub fn router(&self) -> Router {
        http::router(self.container())
    }

    /// Serve until `shutdown` fires, then drain the subscriber.
    ///
    /// # Errors
    ///
    /// Binding the listener or a fatal server error. A subscriber that gives
    /// up on the bus is logged, not returned, so reads keep being served.
    pub async fn run(&self, shutdown: ShutdownSignal) -> Result<()> {
        let addr = self.container.config.http.socket_addr();
        info!(
            service = %self.container.config.bus.service_name,
            %addr,
            "Starting node runtime"
        );

        let subscriber = Arc::clone(&self.container.subscriber);
        let subscriber_signal = shutdown.clone();
        let subscriber_task = tokio::spawn(async move {
            if let Err(e) = subscriber.run(subscriber_signal).await {
                error!(error = %e, "event subscriber stopped; standings will lag until restart");
            }
        });

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding HTTP listener on {addr}"))?;
        info!(%addr, "HTTP server listening");

        let mut server_signal = shutdown;
        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { server_signal.wait().await })
        .await
        .context("HTTP server failed")?;
        info!("HTTP server stopped");

        match tokio::time::timeout(SUBSCRIBER_DRAIN, subscriber_task).await {
            Ok(Ok(())) => info!("Event subscriber stopped"),
            Ok(Err(e)) => warn!(error = %e, "event subscriber task aborted"),
            Err(_) => warn!("event subscriber did not stop in time"),
        }
        Ok(())
    }
}
