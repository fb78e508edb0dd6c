//! Application lifecycle management and graceful shutdown.
//!
//! 1. **Startup**: spawn the expiry sweeper
//! 2. **Runtime**: serve HTTP
//! 3. **Shutdown**: on Ctrl+C or SIGTERM the server stops accepting
//!    connections and drains in-flight requests, the sweeper is told to stop
//!    and is given `shutdown_timeout` to finish its current pass
//!
//! A sweeper pass interrupted by a hard stop is harmless: each order is
//! expired in its own transaction, and the next pass picks up whatever is
//! still stale.

use crate::sweeper::ExpirySweeper;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Running application with its background task.
pub struct Application {
    /// TCP listener for HTTP server
    listener: tokio::net::TcpListener,

    /// Axum router with all HTTP routes
    app: axum::Router,

    /// Expiry sweeper
    sweeper: Arc<ExpirySweeper>,

    /// Shutdown signal broadcaster
    shutdown_tx: broadcast::Sender<()>,

    /// How long to wait for the sweeper to stop
    shutdown_timeout: Duration,
}

impl Application {
    /// Create a new application instance.
    #[must_use]
    pub fn new(
        listener: tokio::net::TcpListener,
        app: axum::Router,
        sweeper: Arc<ExpirySweeper>,
        shutdown_timeout: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            listener,
            app,
            sweeper,
            shutdown_tx,
            shutdown_timeout,
        }
    }

    /// Run until a shutdown signal is received.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP server fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP server fails.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let address = self.listener.local_addr()?;
        let sweeper = self.sweeper.spawn(self.shutdown_tx.subscribe());

        info!(%address, "HTTP server listening for requests");
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped, initiating graceful shutdown...");
        if self.shutdown_tx.send(()).is_err() {
            warn!("Sweeper already stopped");
        }

        match tokio::time::timeout(self.shutdown_timeout, sweeper).await {
            Ok(Ok(())) => info!("Sweeper stopped gracefully"),
            Ok(Err(e)) => warn!(error = %e, "Sweeper task failed"),
            Err(_) => warn!("Sweeper shutdown timed out"),
        }

        info!("Graceful shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a handler cannot be installed, that signal source is ignored and the
/// other one still works.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
