use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid chain at block {index}: {reason}")]
    InvalidChain { index: u64, reason: String },

    #[error("invalid proof: {0}")]
    InvalidProof(#[from] dcns_work::WorkError),

    #[error("previous hash mismatch: expected {expected}, got {actual}")]
    PreviousHashMismatch { expected: String, actual: String },

    #[error("invalid peer address: {0:?}")]
    InvalidPeer(String),

    #[error("{0} chain writes suspended: stored chain is unreadable and still in place")]
    WritesSuspended(dcns_types::ChainKind),

    #[error("storage error: {0}")]
    Store(#[from] dcns_store::StoreError),
}
