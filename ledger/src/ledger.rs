//! Ledger state and its mutating operations.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::LedgerError;
use dcns_network::peer_authority;
use dcns_store::ChainStore;
use dcns_types::{Block, ChainDump, ChainKind, Clock, NodeId, Transaction};
use dcns_work::{check_proof, hash_block, proof_of_work};

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Pending-buffer size that triggers an immediate mine.
    pub auto_mine_threshold: usize,
    /// Starting value of the quota counter.
    pub initial_quota: i64,
    /// Upper bound on each peer query during consensus.
    pub peer_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            auto_mine_threshold: 10,
            initial_quota: 10,
            peer_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of handing transactions to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Pending transactions after the submission (zero when a block was mined).
    pub pending: usize,
    /// The block sealed because the buffer reached the auto-mine threshold.
    pub mined: Option<Block>,
}

pub(crate) struct LedgerState {
    pub(crate) chain: Vec<Block>,
    pub(crate) pending: Vec<Transaction>,
    pub(crate) peers: BTreeSet<String>,
    /// `chain[persisted..]` has not been written yet.
    pub(crate) persisted: usize,
    /// The durable prefix no longer matches `chain` and must be rewritten.
    pub(crate) rewrite: bool,
    /// Stored data that failed to load is still in place; nothing may be written.
    pub(crate) writes_suspended: bool,
}

/// One chain, its pending buffer and its peers.
///
/// Every operation takes the same mutex, so appends, mines, replacements and
/// saves never interleave. The lock is never held across an `.await`.
pub struct Ledger {
    kind: ChainKind,
    owner: NodeId,
    config: LedgerConfig,
    store: Arc<dyn ChainStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// Load the durable chain for `kind`, synthesizing a genesis block if none exists.
    ///
    /// A chain that cannot be loaded is set aside by the store, intact, and
    /// the ledger starts fresh. If it cannot be set aside either, the ledger
    /// runs in memory only and never writes over it.
    pub fn open(
        kind: ChainKind,
        owner: NodeId,
        config: LedgerConfig,
        store: Arc<dyn ChainStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (chain, rewrite, writes_suspended) = match store.load_chain(kind) {
            Ok(chain) => (chain, false, false),
            Err(e) => match store.set_aside_chain(kind) {
                Ok(()) => {
                    warn!(chain = %kind, error = %e, "unreadable chain set aside, starting fresh");
                    (Vec::new(), true, false)
                }
                Err(aside) => {
                    error!(
                        chain = %kind,
                        error = %e,
                        set_aside_error = %aside,
                        "unreadable chain could not be set aside, chain writes suspended"
                    );
                    (Vec::new(), false, true)
                }
            },
        };
        let persisted = chain.len();

        let ledger = Self {
            kind,
            owner,
            config,
            store,
            clock,
            state: Mutex::new(LedgerState {
                chain,
                pending: Vec::new(),
                peers: BTreeSet::new(),
                persisted,
                rewrite,
                writes_suspended,
            }),
        };

        {
            let mut state = ledger.lock();
            if state.chain.is_empty() {
                ledger.tail(&mut state);
                ledger.persist_logged(&mut state);
            }
            info!(chain = %kind, blocks = state.chain.len(), "ledger opened");
        }
        ledger
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Writers never leave the state half-updated, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn owner(&self) -> &NodeId {
        &self.owner
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Add a peer by address. Returns `true` if it was not known yet.
    ///
    /// `http://host:port/...` and `host:port` register the same peer.
    pub fn register_node(&self, address: &str) -> Result<bool, LedgerError> {
        let peer =
            peer_authority(address).ok_or_else(|| LedgerError::InvalidPeer(address.to_string()))?;
        let added = self.lock().peers.insert(peer.clone());
        if added {
            info!(chain = %self.kind, peer = %peer, "peer registered");
        }
        Ok(added)
    }

    /// Buffer one transaction, mining first if the buffer reaches the threshold.
    pub fn new_transaction(&self, tx: Transaction) -> SubmitOutcome {
        self.submit_batch(vec![tx])
    }

    /// Buffer several transactions under one lock, checking the threshold once.
    ///
    /// The whole batch lands in the same block.
    pub fn submit_batch(&self, txs: Vec<Transaction>) -> SubmitOutcome {
        let mut state = self.lock();
        for tx in &txs {
            debug!(chain = %self.kind, kind = tx.kind_name(), "transaction buffered");
        }
        state.pending.extend(txs);

        let mined = if !state.pending.is_empty()
            && state.pending.len() >= self.config.auto_mine_threshold
        {
            let last = self.tail(&mut state);
            Some(self.append(&mut state, proof_of_work(last.proof), hash_block(&last)))
        } else {
            None
        };

        SubmitOutcome {
            pending: state.pending.len(),
            mined,
        }
    }

    /// Seal the pending buffer into a new block (possibly empty).
    pub fn mine(&self) -> Block {
        let mut state = self.lock();
        let last = self.tail(&mut state);
        self.append(&mut state, proof_of_work(last.proof), hash_block(&last))
    }

    /// Seal a block, using the supplied proof and/or previous hash when given.
    ///
    /// Supplied values must agree with the current tail; nothing changes otherwise.
    pub fn mine_with(
        &self,
        proof: Option<u64>,
        previous_hash: Option<String>,
    ) -> Result<Block, LedgerError> {
        let mut state = self.lock();
        let last = self.tail(&mut state);

        let proof = match proof {
            Some(proof) => {
                check_proof(last.proof, proof)?;
                proof
            }
            None => proof_of_work(last.proof),
        };

        let expected = hash_block(&last);
        let previous_hash = match previous_hash {
            Some(actual) if actual != expected => {
                return Err(LedgerError::PreviousHashMismatch { expected, actual });
            }
            _ => expected,
        };

        Ok(self.append(&mut state, proof, previous_hash))
    }

    /// The last block, synthesizing genesis on an empty chain.
    fn tail(&self, state: &mut LedgerState) -> Block {
        match state.chain.last() {
            Some(block) => block.clone(),
            None => {
                let genesis = Block::genesis(self.owner.clone(), self.clock.now());
                state.chain.push(genesis.clone());
                genesis
            }
        }
    }

    fn append(&self, state: &mut LedgerState, proof: u64, previous_hash: String) -> Block {
        let block = Block {
            index: state.chain.len() as u64 + 1,
            source: self.owner.clone(),
            timestamp: self.clock.now(),
            transactions: std::mem::take(&mut state.pending),
            proof,
            previous_hash,
        };
        state.chain.push(block.clone());
        info!(
            chain = %self.kind,
            index = block.index,
            transactions = block.transactions.len(),
            "block mined"
        );
        self.persist_logged(state);
        block
    }

    /// Replace the chain with `candidate` if it is still strictly longer.
    pub(crate) fn adopt(&self, candidate: Vec<Block>) -> bool {
        let mut state = self.lock();
        if candidate.len() <= state.chain.len() {
            debug!(
                chain = %self.kind,
                local = state.chain.len(),
                candidate = candidate.len(),
                "local chain caught up, keeping it"
            );
            return false;
        }
        info!(
            chain = %self.kind,
            old_len = state.chain.len(),
            new_len = candidate.len(),
            "chain replaced by longer peer chain"
        );
        state.chain = candidate;
        state.rewrite = true;
        self.persist_logged(&mut state);
        true
    }

    fn persist(&self, state: &mut LedgerState) -> Result<(), LedgerError> {
        if state.writes_suspended {
            return Err(LedgerError::WritesSuspended(self.kind));
        }
        if state.rewrite || state.persisted > state.chain.len() {
            self.store.replace_chain(self.kind, &state.chain)?;
            state.rewrite = false;
        } else if state.persisted < state.chain.len() {
            self.store
                .append_blocks(self.kind, &state.chain[state.persisted..])?;
        }
        state.persisted = state.chain.len();
        Ok(())
    }

    fn persist_logged(&self, state: &mut LedgerState) {
        if let Err(e) = self.persist(state) {
            warn!(chain = %self.kind, error = %e, "failed to persist chain");
        }
    }

    /// Write the not-yet-durable suffix of the chain.
    pub fn save(&self) -> Result<(), LedgerError> {
        let mut state = self.lock();
        self.persist(&mut state)
    }

    /// Starts at the configured initial quota; each block sealed by the owner
    /// costs one, each mining reward paid to the owner adds its amount.
    pub fn quota(&self) -> i64 {
        let state = self.lock();
        let mut quota = self.config.initial_quota;
        for block in &state.chain {
            if block.source == self.owner {
                quota -= 1;
            }
            for tx in &block.transactions {
                if let Transaction::MiningReward(reward) = tx {
                    if reward.node_id == self.owner {
                        quota += reward.reward;
                    }
                }
            }
        }
        quota
    }

    pub fn len(&self) -> usize {
        self.lock().chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().chain.is_empty()
    }

    pub fn last_block(&self) -> Option<Block> {
        self.lock().chain.last().cloned()
    }

    pub fn chain(&self) -> Vec<Block> {
        self.lock().chain.clone()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.lock().pending.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn dump(&self) -> ChainDump {
        ChainDump::new(self.chain())
    }

    pub fn peers(&self) -> Vec<String> {
        self.lock().peers.iter().cloned().collect()
    }

    /// Run `f` over the chain and pending buffer without cloning them.
    ///
    /// `f` runs under the ledger lock and must not call back into this ledger.
    pub fn with_state<R>(&self, f: impl FnOnce(&[Block], &[Transaction]) -> R) -> R {
        let state = self.lock();
        f(&state.chain, &state.pending)
    }
}
