//! Durable storage for entries waiting to be handed to a ledger.

use crate::StoreError;
use dcns_types::{ChainKind, Transaction};

pub trait StagingStore: Send + Sync {
    /// Entries staged before the last shutdown. Missing storage loads as empty.
    fn load_staged(&self, kind: ChainKind) -> Result<Vec<Transaction>, StoreError>;

    /// Replace the staged set for `kind` with `entries` (may be empty).
    fn save_staged(&self, kind: ChainKind, entries: &[Transaction]) -> Result<(), StoreError>;

    /// Move a staged set that failed to load out of the way, keeping its contents.
    fn set_aside_staged(&self, kind: ChainKind) -> Result<(), StoreError>;
}
