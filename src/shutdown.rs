//! Graceful Shutdown Handling
//!
//! Broadcasts a single stop signal to the reporter (and anything else the
//! host runs) on SIGTERM, SIGINT or an explicit request, then waits for the
//! tasks to drain within a bounded time.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    /// Broadcast sender for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// How long a task may take to finish after the signal
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            shutdown_tx,
            timeout,
        }
    }

    /// Get a shutdown receiver, e.g. for [`crate::Reporter::run`]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Signal every subscriber to stop
    pub fn shutdown(&self) {
        match self.shutdown_tx.send(()) {
            Ok(receivers) => debug!("Shutdown signal sent to {} receivers", receivers),
            Err(_) => warn!("Shutdown requested but nothing is listening"),
        }
    }

    /// Wait for SIGTERM or SIGINT, then signal shutdown
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

        self.shutdown();
        Ok(())
    }

    /// Wait for `handle` to finish, aborting it once the timeout passes
    pub async fn wait_for(&self, mut handle: JoinHandle<()>) -> Result<()> {
        let start_time = Instant::now();

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(())) => {
                info!("Task finished gracefully in {:?}", start_time.elapsed());
                Ok(())
            }
            Ok(Err(e)) if e.is_cancelled() => {
                debug!("Task was cancelled");
                Ok(())
            }
            Ok(Err(e)) => Err(anyhow!("Task failed: {}", e)),
            Err(_) => {
                warn!("Shutdown timeout reached after {:?}, aborting task", self.timeout);
                handle.abort();
                Err(anyhow!("Task did not finish within {:?}", self.timeout))
            }
        }
    }
}
