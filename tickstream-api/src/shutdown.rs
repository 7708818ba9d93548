//! Graceful shutdown coordination.
//!
//! A single [`ShutdownController`] is shared by the HTTP server, the
//! coordinator's schedulers, and the maintenance tasks. Initiating
//! shutdown is idempotent; components subscribe once and exit when the
//! signal fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// Shutdown controller for coordinating graceful shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    /// Whether shutdown has been initiated.
    shutdown_initiated: Arc<AtomicBool>,
    /// Sender for shutdown notification.
    shutdown_tx: broadcast::Sender<()>,
    /// Watch channel for shutdown completion.
    completion_tx: Arc<watch::Sender<bool>>,
    /// Receiver for shutdown completion.
    completion_rx: watch::Receiver<bool>,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Creates a new shutdown controller.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (completion_tx, completion_rx) = watch::channel(false);

        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            completion_tx: Arc::new(completion_tx),
            completion_rx,
        }
    }

    /// Initiates shutdown, notifying all subscribers. Idempotent.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.shutdown_tx.send(());
        }
    }

    /// Returns whether shutdown has been initiated.
    #[must_use]
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Returns a future that completes when shutdown is initiated.
    pub async fn wait_for_shutdown(&self) {
        // Subscribe before checking the flag so an initiation landing
        // between the two cannot be missed
        let mut rx = self.shutdown_tx.subscribe();
        if self.is_shutdown_initiated() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Returns a receiver for shutdown signals.
    ///
    /// Subscribe before entering a select loop; a receiver created after
    /// the signal fires would miss it (check `is_shutdown_initiated`
    /// first).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Marks shutdown as complete.
    pub fn mark_complete(&self) {
        let _ = self.completion_tx.send(true);
    }

    /// Waits for shutdown to complete with a timeout.
    ///
    /// Returns `true` if shutdown completed, `false` on timeout.
    pub async fn wait_for_completion(&self, timeout: Duration) -> bool {
        let mut rx = self.completion_rx.clone();
        if *rx.borrow() {
            return true;
        }

        tokio::select! {
            result = rx.changed() => {
                result.is_ok() && *rx.borrow()
            }
            () = tokio::time::sleep(timeout) => {
                warn!("Shutdown completion timeout after {:?}", timeout);
                false
            }
        }
    }
}

/// Sets up signal handlers for graceful shutdown.
///
/// Listens for SIGINT (Ctrl+C) and SIGTERM signals.
pub async fn setup_signal_handlers(controller: ShutdownController) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT (Ctrl+C)");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        controller.initiate_shutdown();
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl+C handler");
        info!("Received Ctrl+C");
        controller.initiate_shutdown();
    }
}
