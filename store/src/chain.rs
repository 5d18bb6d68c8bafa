//! Durable block storage, one chain per [`ChainKind`].

use crate::StoreError;
use dcns_types::{Block, ChainKind};

/// Append-mostly storage for a chain of blocks.
///
/// Implementations must be safe for concurrent use; callers serialize writes
/// per chain kind (the owning ledger holds its lock while writing).
pub trait ChainStore: Send + Sync {
    /// Load every durable block, oldest first. A missing chain loads as empty.
    fn load_chain(&self, kind: ChainKind) -> Result<Vec<Block>, StoreError>;

    /// Append `blocks` after the ones already stored.
    fn append_blocks(&self, kind: ChainKind, blocks: &[Block]) -> Result<(), StoreError>;

    /// Overwrite the stored chain with `blocks`.
    fn replace_chain(&self, kind: ChainKind, blocks: &[Block]) -> Result<(), StoreError>;

    /// Move a stored chain that failed to load out of the way, keeping its
    /// contents, so a fresh chain can be written without destroying it.
    fn set_aside_chain(&self, kind: ChainKind) -> Result<(), StoreError>;
}
