//! HTTP server for the DCNS node.
//!
//! Provides endpoints for:
//! - Hostname registration, batch updates, lookup and status
//! - Peer registration, chain dumps and consensus triggers
//! - Wallet balances, owned domains and transfers
//! - Debug views of pending buffers, forced mining and quotas

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use handlers::router;
pub use server::RpcServer;
