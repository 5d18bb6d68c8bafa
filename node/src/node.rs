//! The DCNS node: a resolver plus its background tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::resolver::{Resolver, ResolverDeps};
use crate::shutdown::ShutdownController;
use crate::timers::spawn_flush_timers;
use dcns_types::{ChainKind, ChainScope};

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DcnsNode {
    config: NodeConfig,
    resolver: Arc<Resolver>,
    shutdown: ShutdownController,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl DcnsNode {
    /// Open the node's JSON data directory and HTTP peer client.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let deps = ResolverDeps::json(&config.data_dir, config.ledger.peer_timeout())?;
        Self::with_deps(config, deps)
    }

    /// Build a node on caller-supplied storage, peers and clock.
    pub fn with_deps(config: NodeConfig, deps: ResolverDeps) -> Result<Self, NodeError> {
        config.validate()?;
        let resolver = Arc::new(Resolver::new(
            config.node_id.clone(),
            config.ledger.clone(),
            deps,
        ));
        Ok(Self {
            config,
            resolver,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }

    /// Register bootstrap peers, sync with them and start the flush timers.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        tracing::info!(
            node_id = %self.config.node_id,
            data_dir = %self.config.data_dir.display(),
            rpc_port = self.config.rpc_port,
            "DCNS node starting"
        );

        for peer in &self.config.bootstrap_peers {
            if let Err(e) = self.resolver.register_node(peer, ChainScope::Both) {
                tracing::warn!(peer = %peer, error = %e, "ignoring invalid bootstrap peer");
            }
        }
        if self.resolver.network_size(ChainScope::Both) > 0 {
            // Runs in the background; the node serves requests meanwhile.
            self.resolver.spawn_resolve_conflicts(ChainScope::Both);
        }

        let timers = spawn_flush_timers(
            &self.resolver,
            self.config.ledger.flush_interval(),
            &self.shutdown,
        );
        self.task_handles.extend(timers);

        tracing::info!(
            register_blocks = self.resolver.ledger(ChainKind::Register).len(),
            dns_blocks = self.resolver.ledger(ChainKind::Dns).len(),
            "DCNS node started"
        );
        Ok(())
    }

    /// Stop background tasks and write everything to disk.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("DCNS node stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err()
        {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        self.resolver.save_data()?;
        tracing::info!("DCNS node stopped");
        Ok(())
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Shared handle for request handlers.
    pub fn resolver(&self) -> Arc<Resolver> {
        Arc::clone(&self.resolver)
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }
}
