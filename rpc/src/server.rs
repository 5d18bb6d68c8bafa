//! Axum-based RPC server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::error::RpcError;
use crate::handlers::router;
use dcns_node::Resolver;

pub struct RpcServer {
    port: u16,
    resolver: Arc<Resolver>,
}

impl RpcServer {
    pub fn new(port: u16, resolver: Arc<Resolver>) -> Self {
        Self { port, resolver }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.resolver))
    }

    /// Bind all interfaces on the configured port and serve until `shutdown` fires.
    pub async fn start(&self, shutdown: broadcast::Receiver<()>) -> Result<(), RpcError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), RpcError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "RPC server listening");
        }
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("RPC server shutting down");
            })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
