use thiserror::Error;

/// Failures reported to callers of resolver operations.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: i64, available: i64 },

    #[error("hostname {0} is already registered")]
    AlreadyRegistered(String),

    #[error("no entry for {0}")]
    NotFound(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] dcns_ledger::LedgerError),
}

impl ResolverError {
    /// Stable identifier for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::AlreadyRegistered(_) => "already_registered",
            Self::NotFound(_) => "not_found",
            Self::Ledger(dcns_ledger::LedgerError::InvalidPeer(_)) => "validation_error",
            Self::Ledger(_) => "ledger_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] dcns_store::StoreError),

    #[error("network error: {0}")]
    Network(#[from] dcns_network::NetworkError),

    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RPC server error: {0}")]
    Rpc(String),

    #[error("shutdown timeout")]
    ShutdownTimeout,

    #[error("{0}")]
    Other(String),
}
