//! Durable per-chain queue of entries waiting to be handed to a ledger.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use dcns_ledger::{Ledger, SubmitOutcome};
use dcns_store::StagingStore;
use dcns_types::{ChainKind, Transaction};

/// Entries accepted by the resolver but not yet in a ledger's pending buffer.
///
/// The staging file is rewritten on every change. A drain holds the queue
/// lock across snapshot, clear, file rewrite and hand-off, so an entry is
/// always either here or in exactly one ledger buffer.
pub struct StagingQueue {
    kind: ChainKind,
    threshold: usize,
    store: Arc<dyn StagingStore>,
    entries: Mutex<Vec<Transaction>>,
    /// An unreadable staging file is still in place and must not be overwritten.
    writes_suspended: bool,
}

impl StagingQueue {
    /// Reload whatever was staged before the last shutdown.
    ///
    /// An unreadable staging file is set aside intact before the queue starts
    /// empty; if that fails the queue keeps its entries in memory only.
    pub fn open(kind: ChainKind, threshold: usize, store: Arc<dyn StagingStore>) -> Self {
        let (entries, writes_suspended) = match store.load_staged(kind) {
            Ok(entries) => (entries, false),
            Err(e) => match store.set_aside_staged(kind) {
                Ok(()) => {
                    warn!(chain = %kind, error = %e, "unreadable staging queue set aside, starting empty");
                    (Vec::new(), false)
                }
                Err(aside) => {
                    error!(
                        chain = %kind,
                        error = %e,
                        set_aside_error = %aside,
                        "unreadable staging queue could not be set aside, staging writes suspended"
                    );
                    (Vec::new(), true)
                }
            },
        };
        if !entries.is_empty() {
            info!(chain = %kind, entries = entries.len(), "staged entries restored");
        }
        Self {
            kind,
            threshold,
            store,
            entries: Mutex::new(entries),
            writes_suspended,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transaction>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &[Transaction]) {
        if self.writes_suspended {
            debug!(chain = %self.kind, "staging writes suspended, keeping queue in memory");
            return;
        }
        if let Err(e) = self.store.save_staged(self.kind, entries) {
            warn!(chain = %self.kind, error = %e, "failed to persist staging queue");
        }
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    /// Append `txs` as one unit. Returns the queue length afterwards.
    pub fn stage(&self, txs: Vec<Transaction>) -> usize {
        let mut entries = self.lock();
        entries.extend(txs);
        self.persist(&entries);
        debug!(chain = %self.kind, staged = entries.len(), "entries staged");
        entries.len()
    }

    /// Whether a queue of `len` entries should be flushed right away.
    pub fn reached_threshold(&self, len: usize) -> bool {
        len >= self.threshold
    }

    /// Move every staged entry into `ledger` as one batch.
    ///
    /// Returns `None` when there was nothing to move. Entries staged while the
    /// drain runs wait for the next one.
    pub fn drain_into(&self, ledger: &Ledger) -> Option<SubmitOutcome> {
        let mut entries = self.lock();
        if entries.is_empty() {
            return None;
        }
        let batch = std::mem::take(&mut *entries);
        self.persist(&entries);
        info!(chain = %self.kind, entries = batch.len(), "staging flushed");
        Some(ledger.submit_batch(batch))
    }

    /// Run `f` over the staged entries while the queue is locked.
    ///
    /// A ledger may be read inside `f`; the reverse order is never taken.
    pub fn with_entries<R>(&self, f: impl FnOnce(&[Transaction]) -> R) -> R {
        let entries = self.lock();
        f(&entries)
    }

    pub fn snapshot(&self) -> Vec<Transaction> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn save(&self) {
        let entries = self.lock();
        self.persist(&entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcns_ledger::LedgerConfig;
    use dcns_nullables::{NullChainStore, NullClock, NullStagingStore};
    use dcns_types::{DnsRecord, NodeId};

    fn record(host: &str) -> Transaction {
        Transaction::DnsRecord(DnsRecord {
            hostname: host.into(),
            ip: "10.1.1.1".into(),
            port: 53,
            node_id: NodeId::new("n"),
            lease_years: 0,
        })
    }

    fn ledger() -> Ledger {
        Ledger::open(
            ChainKind::Dns,
            NodeId::new("n"),
            LedgerConfig::default(),
            Arc::new(NullChainStore::new()),
            Arc::new(NullClock::new(10)),
        )
    }

    #[test]
    fn stage_persists_every_change() {
        let store = Arc::new(NullStagingStore::new());
        let queue = StagingQueue::open(ChainKind::Dns, 10, store.clone());
        assert_eq!(queue.stage(vec![record("a.dc")]), 1);
        assert_eq!(queue.stage(vec![record("b.dc"), record("c.dc")]), 3);
        assert_eq!(store.stored(ChainKind::Dns).len(), 3);
        assert_eq!(store.save_calls(), 2);
    }

    #[test]
    fn open_restores_staged_entries() {
        let store = Arc::new(
            NullStagingStore::new().with_staged(ChainKind::Dns, vec![record("kept.dc")]),
        );
        let queue = StagingQueue::open(ChainKind::Dns, 10, store);
        assert_eq!(queue.snapshot(), vec![record("kept.dc")]);
    }

    #[test]
    fn unreadable_staging_file_is_set_aside_not_overwritten() {
        use dcns_store::JsonFileStore;
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let path = store.staging_path(ChainKind::Dns);
        fs::write(&path, "[{\"DnsRecord\":").unwrap();

        let queue = StagingQueue::open(ChainKind::Dns, 10, store.clone());
        assert!(queue.is_empty());
        queue.stage(vec![record("fresh.dc")]);

        let kept = fs::read_to_string(format!("{}.corrupt", path.display())).unwrap();
        assert_eq!(kept, "[{\"DnsRecord\":");
        assert_eq!(store.load_staged(ChainKind::Dns).unwrap(), vec![record("fresh.dc")]);
    }

    #[test]
    fn drain_hands_everything_to_the_ledger() {
        let store = Arc::new(NullStagingStore::new());
        let queue = StagingQueue::open(ChainKind::Dns, 10, store.clone());
        let ledger = ledger();
        queue.stage(vec![record("a.dc"), record("b.dc")]);

        let outcome = queue.drain_into(&ledger).expect("queue was not empty");
        assert_eq!(outcome.pending, 2);
        assert!(outcome.mined.is_none());
        assert!(queue.is_empty());
        assert!(store.stored(ChainKind::Dns).is_empty());
        assert_eq!(ledger.pending(), vec![record("a.dc"), record("b.dc")]);
    }

    #[test]
    fn drain_of_empty_queue_is_a_no_op() {
        let queue = StagingQueue::open(ChainKind::Dns, 10, Arc::new(NullStagingStore::new()));
        assert!(queue.drain_into(&ledger()).is_none());
    }

    #[test]
    fn drain_can_trigger_a_mine() {
        let queue = StagingQueue::open(ChainKind::Dns, 10, Arc::new(NullStagingStore::new()));
        let ledger = ledger();
        queue.stage((0..10).map(|i| record(&format!("h{i}.dc"))).collect());
        let outcome = queue.drain_into(&ledger).unwrap();
        let block = outcome.mined.expect("ten entries reach the ledger threshold");
        assert_eq!(block.transactions.len(), 10);
        assert_eq!(ledger.pending_len(), 0);
    }

    #[test]
    fn threshold_check() {
        let queue = StagingQueue::open(ChainKind::Register, 3, Arc::new(NullStagingStore::new()));
        assert!(!queue.reached_threshold(2));
        assert!(queue.reached_threshold(3));
        assert_eq!(queue.kind(), ChainKind::Register);
    }
}
