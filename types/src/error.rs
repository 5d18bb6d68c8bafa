//! Parse errors for the shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("unknown chain kind: {0}")]
    UnknownChainKind(String),

    #[error("invalid node id: {0}")]
    InvalidNodeId(String),
}
