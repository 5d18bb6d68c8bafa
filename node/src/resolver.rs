//! Dual-ledger coordinator.
//!
//! Owns the register and DNS ledgers, their staging queues and the derived
//! DNS cache, and implements every hostname, token and chain operation the
//! node exposes.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::DnsCache;
use crate::config::LedgerParams;
use crate::entry::{BatchOutcome, EntryReceipt, NewEntry, RawEntry, RejectedEntry};
use crate::staging::StagingQueue;
use crate::status::{
    latest_buffered, latest_record, lease_expired, leases_of, DomainLease, DomainStatus,
    Resolution,
};
use crate::tokens::TokenReplay;
use crate::{NodeError, ResolverError};
use dcns_ledger::{Ledger, SubmitOutcome};
use dcns_network::{ChainFetcher, HttpPeerClient, PeerBroadcaster, PeerNotifier};
use dcns_store::{CacheSnapshot, CacheStore, ChainStore, JsonFileStore, StagingStore, StoreError};
use dcns_types::{
    Block, ChainDump, ChainKind, ChainScope, Clock, DnsRecord, MiningReward, NodeId, SystemClock,
    TokenPayment, TokenTransfer, Transaction,
};

/// Everything a resolver talks to outside its own memory.
#[derive(Clone)]
pub struct ResolverDeps {
    pub chains: Arc<dyn ChainStore>,
    pub staging: Arc<dyn StagingStore>,
    pub cache: Arc<dyn CacheStore>,
    pub fetcher: Arc<dyn ChainFetcher>,
    pub notifier: Arc<dyn PeerNotifier>,
    pub clock: Arc<dyn Clock>,
}

impl ResolverDeps {
    /// JSON files under `data_dir`, HTTP peers, wall-clock time.
    pub fn json(data_dir: impl Into<PathBuf>, peer_timeout: Duration) -> Result<Self, NodeError> {
        let store = Arc::new(JsonFileStore::open(data_dir)?);
        let peers = Arc::new(HttpPeerClient::with_timeout(peer_timeout)?);
        Ok(Self {
            chains: store.clone(),
            staging: store.clone(),
            cache: store,
            fetcher: peers.clone(),
            notifier: peers,
            clock: Arc::new(SystemClock),
        })
    }
}

/// Chain dump for one chain, or both side by side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainView {
    Both {
        register_chain: Vec<Block>,
        register_length: usize,
        dns_chain: Vec<Block>,
        dns_length: usize,
    },
    Single(ChainDump),
}

/// Unsealed transactions of one chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferDump {
    /// In the ledger's pending buffer, sealed by the next block.
    pub pending: Vec<Transaction>,
    /// In the staging queue, not yet handed to the ledger.
    pub staged: Vec<Transaction>,
}

pub struct Resolver {
    owner: NodeId,
    params: LedgerParams,
    register: Ledger,
    dns: Ledger,
    register_staging: StagingQueue,
    dns_staging: StagingQueue,
    cache: DnsCache,
    cache_store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn ChainFetcher>,
    broadcaster: PeerBroadcaster,
    clock: Arc<dyn Clock>,
    /// Serializes status/balance checks with the staging that depends on them.
    admission: Mutex<()>,
}

impl Resolver {
    /// Open both ledgers and staging queues and build the cache.
    pub fn new(owner: NodeId, params: LedgerParams, deps: ResolverDeps) -> Self {
        let config = params.ledger_config();
        let open_ledger = |kind| {
            Ledger::open(
                kind,
                owner.clone(),
                config.clone(),
                Arc::clone(&deps.chains),
                Arc::clone(&deps.clock),
            )
        };
        let register = open_ledger(ChainKind::Register);
        let dns = open_ledger(ChainKind::Dns);
        let open_queue =
            |kind| StagingQueue::open(kind, params.staging_threshold, Arc::clone(&deps.staging));
        let register_staging = open_queue(ChainKind::Register);
        let dns_staging = open_queue(ChainKind::Dns);

        let resolver = Self {
            owner,
            params,
            register,
            dns,
            register_staging,
            dns_staging,
            cache: DnsCache::new(),
            cache_store: deps.cache,
            fetcher: deps.fetcher,
            broadcaster: PeerBroadcaster::new(deps.notifier),
            clock: deps.clock,
            admission: Mutex::new(()),
        };
        resolver.refresh_cache();
        resolver
    }

    pub fn owner(&self) -> &NodeId {
        &self.owner
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn ledger(&self, kind: ChainKind) -> &Ledger {
        match kind {
            ChainKind::Register => &self.register,
            ChainKind::Dns => &self.dns,
        }
    }

    pub fn staging(&self, kind: ChainKind) -> &StagingQueue {
        match kind {
            ChainKind::Register => &self.register_staging,
            ChainKind::Dns => &self.dns_staging,
        }
    }

    pub fn cache(&self) -> &DnsCache {
        &self.cache
    }

    fn admit(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Hostnames ──────────────────────────────────────────────────────

    /// First match wins: unsealed register entries and staged DNS entries,
    /// then the register chain (lease rule), then the DNS chain.
    pub fn check_domain_status(&self, hostname: &str) -> DomainStatus {
        let register_buffered = self.register_staging.with_entries(|staged| {
            latest_buffered(staged, hostname).is_some()
                || self
                    .register
                    .with_state(|_, pending| latest_buffered(pending, hostname).is_some())
        });
        if register_buffered {
            return DomainStatus::buffered(ChainKind::Register);
        }
        if self
            .dns_staging
            .with_entries(|staged| latest_buffered(staged, hostname).is_some())
        {
            return DomainStatus::buffered(ChainKind::Dns);
        }

        let now = self.clock.now();
        let leased = self.register.with_state(|chain, _| {
            latest_record(chain, hostname).map(|(block, record)| {
                let expired =
                    lease_expired(block.timestamp, self.params.lease_secs(record.lease_years), now);
                DomainStatus::confirmed(ChainKind::Register, expired)
            })
        });
        if let Some(status) = leased {
            return status;
        }

        self.dns.with_state(|chain, pending| {
            if latest_buffered(pending, hostname).is_some() {
                DomainStatus::buffered(ChainKind::Dns)
            } else if latest_record(chain, hostname).is_some() {
                DomainStatus::confirmed(ChainKind::Dns, false)
            } else {
                DomainStatus::unregistered()
            }
        })
    }

    /// Validate, price and stage one entry.
    ///
    /// A register entry is staged together with its payment. The queue is
    /// flushed into its ledger once it reaches the staging threshold.
    pub fn new_entry(&self, entry: NewEntry) -> Result<EntryReceipt, ResolverError> {
        entry.validate()?;
        let kind = entry.chain_kind;
        let payer = entry.node_id.clone().unwrap_or_else(|| self.owner.clone());

        let (cost, queued) = match kind {
            ChainKind::Register => {
                let _admission = self.admit();
                if self.check_domain_status(&entry.hostname).blocks_registration() {
                    return Err(ResolverError::AlreadyRegistered(entry.hostname));
                }
                let cost = self.params.lease_cost(entry.lease_years);
                let available = self.get_user_tokens(&payer);
                if available < cost {
                    return Err(ResolverError::InsufficientBalance {
                        needed: cost,
                        available,
                    });
                }
                let payment = TokenPayment {
                    from: payer.clone(),
                    amount: cost,
                    for_hostname: entry.hostname.clone(),
                    timestamp: self.clock.now(),
                };
                let record = DnsRecord {
                    hostname: entry.hostname.clone(),
                    ip: entry.ip,
                    port: entry.port,
                    node_id: payer,
                    lease_years: entry.lease_years,
                };
                let queued = self
                    .register_staging
                    .stage(vec![record.into(), payment.into()]);
                (cost, queued)
            }
            ChainKind::Dns => {
                let record = DnsRecord {
                    hostname: entry.hostname.clone(),
                    ip: entry.ip,
                    port: entry.port,
                    node_id: payer,
                    lease_years: 0,
                };
                (0, self.dns_staging.stage(vec![record.into()]))
            }
        };
        info!(chain = %kind, hostname = %entry.hostname, cost, "entry staged");

        let flushed = self.staging(kind).reached_threshold(queued);
        if flushed {
            self.flush_staging(kind);
        }
        Ok(EntryReceipt {
            hostname: entry.hostname,
            chain_kind: kind,
            cost,
            flushed,
        })
    }

    /// Stage a batch of DNS-chain entries, reporting malformed ones individually.
    pub fn submit_dns_entries(&self, entries: Vec<RawEntry>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for raw in entries {
            let key = raw.key.clone();
            match raw.into_dns_entry().and_then(|entry| self.new_entry(entry)) {
                Ok(_) => outcome.accepted.push(key),
                Err(e) => {
                    debug!(key = %key, error = %e, "batch entry rejected");
                    outcome.rejected.push(RejectedEntry {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcome
    }

    /// Resolve `hostname`: cache, DNS chain, register chain, then unsealed
    /// entries (reported with `on_chain = false`).
    pub fn lookup(&self, hostname: &str) -> Result<Resolution, ResolverError> {
        if let Some(cached) = self.cache.get(hostname) {
            return Ok(Resolution {
                ip: cached.ip,
                port: cached.port,
                on_chain: true,
            });
        }

        for ledger in [&self.dns, &self.register] {
            let sealed = ledger.with_state(|chain, _| {
                latest_record(chain, hostname).map(|(_, record)| Resolution::from_record(record, true))
            });
            if let Some(found) = sealed {
                return Ok(found);
            }
        }

        for kind in [ChainKind::Dns, ChainKind::Register] {
            let unsealed = self.staging(kind).with_entries(|staged| {
                latest_buffered(staged, hostname)
                    .map(|record| Resolution::from_record(record, false))
                    .or_else(|| {
                        self.ledger(kind).with_state(|_, pending| {
                            latest_buffered(pending, hostname)
                                .map(|record| Resolution::from_record(record, false))
                        })
                    })
            });
            if let Some(found) = unsealed {
                return Ok(found);
            }
        }

        Err(ResolverError::NotFound(hostname.to_string()))
    }

    /// Register-chain leases currently held by `node_id`.
    pub fn domains_of(&self, node_id: &NodeId) -> Vec<DomainLease> {
        let now = self.clock.now();
        self.register.with_state(|chain, _| {
            leases_of(chain, node_id, |years| self.params.lease_secs(years), now)
        })
    }

    // ── Tokens ─────────────────────────────────────────────────────────

    /// Replay of the register chain, its pending buffer and its staging queue.
    fn token_replay(&self) -> TokenReplay {
        self.register_staging.with_entries(|staged| {
            self.register.with_state(|chain, pending| {
                let mut replay = TokenReplay::new();
                replay.apply_all(chain.iter().flat_map(|block| &block.transactions));
                replay.apply_all(pending);
                replay.apply_all(staged);
                replay
            })
        })
    }

    pub fn get_user_tokens(&self, node_id: &NodeId) -> i64 {
        self.token_replay()
            .balance(node_id, self.params.initial_balance)
    }

    /// Stage a transfer on the register chain. Returns the sender's new balance.
    pub fn transfer_tokens(
        &self,
        from: &NodeId,
        to: &NodeId,
        amount: i64,
    ) -> Result<i64, ResolverError> {
        if amount <= 0 {
            return Err(ResolverError::Validation("amount must be positive".into()));
        }
        for id in [from, to] {
            id.as_str()
                .parse::<NodeId>()
                .map_err(|e| ResolverError::Validation(e.to_string()))?;
        }
        if from == to {
            return Err(ResolverError::Validation(
                "cannot transfer tokens to the sender".into(),
            ));
        }

        let queued = {
            let _admission = self.admit();
            let available = self.get_user_tokens(from);
            if available < amount {
                return Err(ResolverError::InsufficientBalance {
                    needed: amount,
                    available,
                });
            }
            let transfer = TokenTransfer {
                from: from.clone(),
                to: to.clone(),
                amount,
                timestamp: self.clock.now(),
            };
            self.register_staging.stage(vec![transfer.into()])
        };
        info!(from = %from, to = %to, amount, "transfer staged");

        if self.register_staging.reached_threshold(queued) {
            self.flush_staging(ChainKind::Register);
        }
        Ok(self.get_user_tokens(from))
    }

    // ── Mining ─────────────────────────────────────────────────────────

    /// Hand the staging queue of `kind` to its ledger.
    pub fn flush_staging(&self, kind: ChainKind) -> Option<SubmitOutcome> {
        let outcome = self.staging(kind).drain_into(self.ledger(kind))?;
        if let Some(block) = &outcome.mined {
            self.after_mine(kind, block.clone());
        }
        Some(outcome)
    }

    /// Timer tick: flush staging, then seal whatever entries are pending.
    ///
    /// A buffer holding only mining rewards is left for the next real entry.
    pub fn periodic_flush(&self, kind: ChainKind) -> Option<Block> {
        if let Some(block) = self.flush_staging(kind).and_then(|outcome| outcome.mined) {
            return Some(block);
        }
        let ledger = self.ledger(kind);
        let has_entries = ledger.with_state(|_, pending| {
            pending
                .iter()
                .any(|tx| !matches!(tx, Transaction::MiningReward(_)))
        });
        if !has_entries {
            return None;
        }
        let block = ledger.mine();
        self.after_mine(kind, block.clone());
        Some(block)
    }

    /// Flush staging into the ledger of `kind` and seal a block.
    pub fn mine_kind(&self, kind: ChainKind) -> Block {
        self.flush_staging(kind);
        let block = self.ledger(kind).mine();
        self.after_mine(kind, block.clone());
        block
    }

    pub fn mine_register_block(&self) -> Block {
        self.mine_kind(ChainKind::Register)
    }

    pub fn mine_dns_block(&self) -> Block {
        self.mine_kind(ChainKind::Dns)
    }

    /// Force a block on every chain in `scope`, register first.
    pub fn mine(&self, scope: ChainScope) -> BTreeMap<ChainKind, Block> {
        scope
            .kinds()
            .iter()
            .map(|&kind| (kind, self.mine_kind(kind)))
            .collect()
    }

    /// Seal a block with a caller-supplied proof and/or previous hash.
    pub fn mine_with(
        &self,
        kind: ChainKind,
        proof: Option<u64>,
        previous_hash: Option<String>,
    ) -> Result<Block, ResolverError> {
        let block = self.ledger(kind).mine_with(proof, previous_hash)?;
        self.after_mine(kind, block.clone());
        Ok(block)
    }

    /// Follow-up for every sealed block, including blocks sealed as a side
    /// effect of this follow-up: queue the miner's reward, notify peers and,
    /// for register blocks, copy their records into the DNS ledger.
    fn after_mine(&self, kind: ChainKind, block: Block) {
        let mut sealed = VecDeque::from([(kind, block)]);
        while let Some((kind, block)) = sealed.pop_front() {
            let ledger = self.ledger(kind);
            let reward = MiningReward {
                node_id: self.owner.clone(),
                block_index: block.index,
                reward: self.params.mine_reward,
            };
            if let Some(next) = ledger.new_transaction(reward.into()).mined {
                sealed.push_back((kind, next));
            }

            self.broadcaster.broadcast(kind, &ledger.peers());

            if kind == ChainKind::Register {
                let records: Vec<Transaction> =
                    block.dns_records().cloned().map(Transaction::from).collect();
                if !records.is_empty() {
                    debug!(records = records.len(), index = block.index, "syncing leases to dns chain");
                    if let Some(next) = self.dns.submit_batch(records).mined {
                        sealed.push_back((ChainKind::Dns, next));
                    }
                }
            }
        }
        self.refresh_cache();
    }

    // ── Peers and consensus ────────────────────────────────────────────

    /// Register a peer on every chain in `scope`. Returns the new network size.
    pub fn register_node(&self, address: &str, scope: ChainScope) -> Result<usize, ResolverError> {
        for &kind in scope.kinds() {
            self.ledger(kind).register_node(address)?;
        }
        Ok(self.network_size(scope))
    }

    /// Distinct peers known on the chains in `scope`.
    pub fn network_size(&self, scope: ChainScope) -> usize {
        scope
            .kinds()
            .iter()
            .flat_map(|&kind| self.ledger(kind).peers())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Adopt the longest valid peer chain for `kind`. Returns whether it changed.
    pub async fn resolve_conflicts(&self, kind: ChainKind) -> bool {
        let replaced = self
            .ledger(kind)
            .resolve_conflicts(self.fetcher.as_ref())
            .await;
        if replaced {
            self.refresh_cache();
        }
        replaced
    }

    /// Run consensus for every chain in `scope` in the background.
    pub fn spawn_resolve_conflicts(self: &Arc<Self>, scope: ChainScope) -> Vec<JoinHandle<bool>> {
        scope
            .kinds()
            .iter()
            .map(|&kind| {
                let resolver = Arc::clone(self);
                tokio::spawn(async move { resolver.resolve_conflicts(kind).await })
            })
            .collect()
    }

    // ── Dumps ──────────────────────────────────────────────────────────

    pub fn dump_chain(&self, scope: ChainScope) -> ChainView {
        match scope {
            ChainScope::Register => ChainView::Single(self.register.dump()),
            ChainScope::Dns => ChainView::Single(self.dns.dump()),
            ChainScope::Both => {
                let register_chain = self.register.chain();
                let dns_chain = self.dns.chain();
                ChainView::Both {
                    register_length: register_chain.len(),
                    register_chain,
                    dns_length: dns_chain.len(),
                    dns_chain,
                }
            }
        }
    }

    pub fn dump_pending(&self, scope: ChainScope) -> BTreeMap<ChainKind, BufferDump> {
        scope
            .kinds()
            .iter()
            .map(|&kind| {
                let dump = self.staging(kind).with_entries(|staged| BufferDump {
                    pending: self.ledger(kind).pending(),
                    staged: staged.to_vec(),
                });
                (kind, dump)
            })
            .collect()
    }

    pub fn chain_quota(&self, scope: ChainScope) -> BTreeMap<ChainKind, i64> {
        scope
            .kinds()
            .iter()
            .map(|&kind| (kind, self.ledger(kind).quota()))
            .collect()
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Rebuild the DNS cache and write the cache projection.
    pub fn refresh_cache(&self) {
        self.cache.rebuild(&self.register.chain(), &self.dns.chain());
        if let Err(e) = self.persist_cache() {
            warn!(error = %e, "failed to persist cache");
        }
    }

    fn persist_cache(&self) -> Result<(), StoreError> {
        let snapshot = CacheSnapshot {
            tokens: self.token_replay().balances(self.params.initial_balance),
            dns_entries: self.cache.snapshot(),
        };
        self.cache_store.save_cache(&snapshot)
    }

    /// Write both chains, both staging queues and the cache now.
    pub fn save_data(&self) -> Result<(), ResolverError> {
        self.register.save()?;
        self.dns.save()?;
        self.register_staging.save();
        self.dns_staging.save();
        self.persist_cache()
            .map_err(|e| ResolverError::Ledger(e.into()))?;
        info!(
            register = self.register.len(),
            dns = self.dns.len(),
            "node data saved"
        );
        Ok(())
    }
}
