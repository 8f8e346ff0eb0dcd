//! Graceful Shutdown Handling
//!
//! Listens for SIGTERM/SIGINT and fans the signal out to the HTTP server and
//! background tasks. In-flight requests are drained up to a timeout.

use crate::Result;
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    /// How long the server may spend draining requests
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get a shutdown receiver for components to listen for shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Broadcast shutdown to every subscriber
    pub fn trigger(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            debug!("No shutdown subscribers left: {}", e);
        }
    }

    /// Future resolving once shutdown has been triggered
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Block until SIGTERM, SIGINT or Ctrl+C, then trigger shutdown
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();
        Ok(())
    }
}

/// Background task that exits when shutdown is broadcast
pub struct ShutdownAwareTask {
    handle: tokio::task::JoinHandle<()>,
    name: String,
}

impl ShutdownAwareTask {
    pub fn spawn<F, Fut>(coordinator: &ShutdownCoordinator, task_name: &str, task_fn: F) -> Self
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let shutdown_rx = coordinator.subscribe();
        let name = task_name.to_string();
        let task_label = name.clone();

        let handle = tokio::spawn(async move {
            debug!("Starting shutdown-aware task: {}", task_label);
            task_fn(shutdown_rx).await;
            debug!("Shutdown-aware task completed: {}", task_label);
        });

        Self { handle, name }
    }

    /// Wait up to `timeout` for the task to finish, aborting it otherwise
    pub async fn join(mut self, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_cancelled() => Ok(()),
            Ok(Err(e)) => {
                error!("Task {} failed: {}", self.name, e);
                Err(anyhow::anyhow!("Task {} failed: {}", self.name, e))
            }
            Err(_) => {
                warn!("Task {} did not stop within {:?}, aborting", self.name, timeout);
                self.handle.abort();
                Ok(())
            }
        }
    }
}
