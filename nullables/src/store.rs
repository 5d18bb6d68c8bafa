//! Nullable stores: thread-safe in-memory persistence for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dcns_store::{CacheSnapshot, CacheStore, ChainStore, StagingStore, StoreError};
use dcns_types::{Block, ChainKind, Transaction};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory chain storage that counts how it was written to.
#[derive(Debug, Default)]
pub struct NullChainStore {
    chains: Mutex<HashMap<ChainKind, Vec<Block>>>,
    /// Chains that fail to load until set aside.
    unreadable: Mutex<HashSet<ChainKind>>,
    /// Chains moved out of the way by `set_aside_chain`.
    set_aside: Mutex<HashMap<ChainKind, Vec<Block>>>,
    appends: AtomicUsize,
    replaces: AtomicUsize,
    failing: AtomicBool,
    set_aside_failing: AtomicBool,
}

impl NullChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a chain as if it had been written by an earlier run.
    pub fn with_chain(self, kind: ChainKind, blocks: Vec<Block>) -> Self {
        lock(&self.chains).insert(kind, blocks);
        self
    }

    /// Make the stored chain for `kind` fail to load, as a damaged file would.
    pub fn with_unreadable_chain(self, kind: ChainKind) -> Self {
        lock(&self.unreadable).insert(kind);
        self
    }

    /// Make `set_aside_chain` fail, leaving the damaged chain in place.
    pub fn fail_set_aside(&self, failing: bool) {
        self.set_aside_failing.store(failing, Ordering::SeqCst);
    }

    /// The blocks moved aside for `kind`, if any.
    pub fn set_aside(&self, kind: ChainKind) -> Option<Vec<Block>> {
        lock(&self.set_aside).get(&kind).cloned()
    }

    /// The blocks currently "on disk" for `kind`.
    pub fn stored(&self, kind: ChainKind) -> Vec<Block> {
        lock(&self.chains).get(&kind).cloned().unwrap_or_default()
    }

    pub fn append_calls(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "null store write failure",
            )))
        } else {
            Ok(())
        }
    }
}

impl ChainStore for NullChainStore {
    fn load_chain(&self, kind: ChainKind) -> Result<Vec<Block>, StoreError> {
        if lock(&self.unreadable).contains(&kind) {
            return Err(StoreError::Corruption(format!("null {kind} chain is unreadable")));
        }
        Ok(self.stored(kind))
    }

    fn append_blocks(&self, kind: ChainKind, blocks: &[Block]) -> Result<(), StoreError> {
        self.check_failing()?;
        self.appends.fetch_add(1, Ordering::SeqCst);
        lock(&self.chains)
            .entry(kind)
            .or_default()
            .extend_from_slice(blocks);
        Ok(())
    }

    fn replace_chain(&self, kind: ChainKind, blocks: &[Block]) -> Result<(), StoreError> {
        self.check_failing()?;
        self.replaces.fetch_add(1, Ordering::SeqCst);
        lock(&self.chains).insert(kind, blocks.to_vec());
        Ok(())
    }

    fn set_aside_chain(&self, kind: ChainKind) -> Result<(), StoreError> {
        if self.set_aside_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "null store rename failure",
            )));
        }
        lock(&self.unreadable).remove(&kind);
        if let Some(blocks) = lock(&self.chains).remove(&kind) {
            lock(&self.set_aside).insert(kind, blocks);
        }
        Ok(())
    }
}

/// In-memory staging storage.
#[derive(Debug, Default)]
pub struct NullStagingStore {
    staged: Mutex<HashMap<ChainKind, Vec<Transaction>>>,
    saves: AtomicUsize,
}

impl NullStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_staged(self, kind: ChainKind, entries: Vec<Transaction>) -> Self {
        lock(&self.staged).insert(kind, entries);
        self
    }

    pub fn stored(&self, kind: ChainKind) -> Vec<Transaction> {
        lock(&self.staged).get(&kind).cloned().unwrap_or_default()
    }

    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StagingStore for NullStagingStore {
    fn load_staged(&self, kind: ChainKind) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.stored(kind))
    }

    fn save_staged(&self, kind: ChainKind, entries: &[Transaction]) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        lock(&self.staged).insert(kind, entries.to_vec());
        Ok(())
    }

    fn set_aside_staged(&self, kind: ChainKind) -> Result<(), StoreError> {
        lock(&self.staged).remove(&kind);
        Ok(())
    }
}

/// Keeps the most recent cache projection for inspection.
#[derive(Debug, Default)]
pub struct NullCacheStore {
    last: Mutex<Option<CacheSnapshot>>,
}

impl NullCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<CacheSnapshot> {
        lock(&self.last).clone()
    }
}

impl CacheStore for NullCacheStore {
    fn save_cache(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError> {
        *lock(&self.last) = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcns_types::{NodeId, Timestamp};

    #[test]
    fn chain_store_tracks_calls() {
        let store = NullChainStore::new();
        let genesis = Block::genesis(NodeId::new("n"), Timestamp::EPOCH);
        store.append_blocks(ChainKind::Dns, &[genesis.clone()]).unwrap();
        store.replace_chain(ChainKind::Dns, &[genesis]).unwrap();
        assert_eq!(store.append_calls(), 1);
        assert_eq!(store.replace_calls(), 1);
        assert_eq!(store.stored(ChainKind::Dns).len(), 1);
        assert!(store.stored(ChainKind::Register).is_empty());
    }

    #[test]
    fn failing_writes_leave_contents_alone() {
        let store = NullChainStore::new();
        store.fail_writes(true);
        let genesis = Block::genesis(NodeId::new("n"), Timestamp::EPOCH);
        assert!(store.append_blocks(ChainKind::Dns, &[genesis]).is_err());
        assert!(store.stored(ChainKind::Dns).is_empty());
    }
}
