//! Stop signal for a running DCNS node.
//!
//! The per-chain flush timers and the RPC server each hold a receiver. The
//! daemon fires the signal on SIGINT/SIGTERM, and [`DcnsNode::stop`] fires it
//! again before the final save so no timer seals a block after the chains
//! have been written.
//!
//! [`DcnsNode::stop`]: crate::DcnsNode::stop

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Broadcasts one stop request to the flush timers and the RPC server.
///
/// A receiver taken after the request was made still sees it, so the RPC
/// server can be started late without missing a stop.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    requested: AtomicBool,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            requested: AtomicBool::new(false),
        }
    }

    /// Receiver for a flush timer or the RPC server.
    ///
    /// Holders must treat any `recv` result, `Lagged` included, as the stop.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        let rx = self.tx.subscribe();
        if self.is_requested() {
            let _ = self.tx.send(());
        }
        rx
    }

    /// Ask every timer and the RPC server to stop. Repeat calls are harmless.
    pub fn shutdown(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            info!("node shutdown requested");
            let _ = self.tx.send(());
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Block until SIGINT or SIGTERM, then request shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, stopping on SIGINT only");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("SIGINT received, stopping DCNS node"),
            _ = terminate => info!("SIGTERM received, stopping DCNS node"),
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
