//! Longest-valid-chain consensus.

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::validation::validate_dump;
use crate::Ledger;
use dcns_network::ChainFetcher;
use dcns_types::Block;

impl Ledger {
    /// Replace the local chain with the longest valid chain among peers.
    ///
    /// Peers and the local length are read under the lock, which is then
    /// released for the network round. Each peer gets at most
    /// `peer_timeout`; failures and invalid chains are logged and skipped.
    /// The winner is installed only if it is still longer than the local
    /// chain once the lock is re-acquired. Returns whether the chain changed.
    pub async fn resolve_conflicts(&self, fetcher: &dyn ChainFetcher) -> bool {
        let (peers, local_len) = {
            let state = self.lock();
            (
                state.peers.iter().cloned().collect::<Vec<_>>(),
                state.chain.len(),
            )
        };
        let kind = self.kind();
        debug!(chain = %kind, peers = peers.len(), local_len, "resolving conflicts");

        let mut best: Option<Vec<Block>> = None;
        let mut best_len = local_len;

        for peer in &peers {
            let dump = match timeout(self.config().peer_timeout, fetcher.fetch_chain(peer, kind))
                .await
            {
                Ok(Ok(dump)) => dump,
                Ok(Err(e)) => {
                    warn!(chain = %kind, peer = %peer, error = %e, "failed to fetch peer chain");
                    continue;
                }
                Err(_) => {
                    warn!(chain = %kind, peer = %peer, "peer chain fetch timed out");
                    continue;
                }
            };

            if dump.length <= best_len {
                continue;
            }
            match validate_dump(&dump) {
                Ok(()) => {
                    best_len = dump.chain.len();
                    best = Some(dump.chain);
                }
                Err(e) => {
                    warn!(chain = %kind, peer = %peer, error = %e, "rejected invalid peer chain");
                }
            }
        }

        match best {
            Some(chain) => self.adopt(chain),
            None => {
                info!(chain = %kind, local_len, "local chain is authoritative");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::{valid_chain, LedgerConfig};
    use dcns_nullables::{NullChainStore, NullClock, NullPeerNetwork};
    use dcns_types::{ChainDump, ChainKind, NodeId};

    use super::*;

    fn ledger(owner: &str, store: Arc<NullChainStore>, peer_timeout: Duration) -> Ledger {
        Ledger::open(
            ChainKind::Register,
            NodeId::new(owner),
            LedgerConfig {
                peer_timeout,
                ..LedgerConfig::default()
            },
            store,
            Arc::new(NullClock::new(500)),
        )
    }

    /// A valid chain of `len` blocks mined by a separate node.
    fn peer_chain(len: usize) -> ChainDump {
        let other = ledger("peer", Arc::new(NullChainStore::new()), Duration::from_secs(1));
        while other.len() < len {
            other.mine();
        }
        other.dump()
    }

    #[tokio::test]
    async fn adopts_longer_valid_chain() {
        let store = Arc::new(NullChainStore::new());
        let local = ledger("me", store.clone(), Duration::from_secs(1));
        local.mine();
        local.mine();
        assert_eq!(local.len(), 3);
        assert_eq!(store.stored(ChainKind::Register).len(), 3);
        local.register_node("a:1").unwrap();
        local.register_node("b:2").unwrap();

        let net = NullPeerNetwork::new();
        // Same length as the local chain, so never a candidate.
        net.serve("a:1", ChainKind::Register, peer_chain(3));
        let longer = peer_chain(5);
        net.serve("b:2", ChainKind::Register, longer.clone());

        assert!(local.resolve_conflicts(&net).await);
        assert_eq!(local.chain(), longer.chain);
        assert!(valid_chain(&local.chain()));
        assert!(local.chain().iter().all(|b| b.source == NodeId::new("peer")));
        // The mined prefix on disk is gone, not extended.
        assert_eq!(store.replace_calls(), 1);
        assert_eq!(store.stored(ChainKind::Register), local.chain());

        // Later mines append to the rewritten file.
        local.mine();
        assert_eq!(store.replace_calls(), 1);
        assert_eq!(store.stored(ChainKind::Register), local.chain());
    }

    #[tokio::test]
    async fn ignores_invalid_longer_chain() {
        let local = ledger("me", Arc::new(NullChainStore::new()), Duration::from_secs(1));
        local.register_node("evil:1").unwrap();

        let mut forged = peer_chain(4);
        forged.chain[2].source = NodeId::new("mallory");
        let net = NullPeerNetwork::new();
        net.serve("evil:1", ChainKind::Register, forged);

        let before = local.chain();
        assert!(!local.resolve_conflicts(&net).await);
        assert_eq!(local.chain(), before);
    }

    #[tokio::test]
    async fn ignores_lying_length() {
        let local = ledger("me", Arc::new(NullChainStore::new()), Duration::from_secs(1));
        local.register_node("liar:1").unwrap();

        let mut dump = peer_chain(1);
        dump.length = 50;
        let net = NullPeerNetwork::new();
        net.serve("liar:1", ChainKind::Register, dump);

        assert!(!local.resolve_conflicts(&net).await);
        assert_eq!(local.len(), 1);
    }

    #[tokio::test]
    async fn keeps_local_when_peers_are_not_longer() {
        let local = ledger("me", Arc::new(NullChainStore::new()), Duration::from_secs(1));
        local.mine();
        local.mine();
        local.register_node("a:1").unwrap();

        let net = NullPeerNetwork::new();
        net.serve("a:1", ChainKind::Register, peer_chain(3));

        assert!(!local.resolve_conflicts(&net).await);
        assert_eq!(local.last_block().unwrap().source, NodeId::new("me"));
    }

    #[tokio::test]
    async fn skips_unreachable_and_slow_peers() {
        let local = ledger("me", Arc::new(NullChainStore::new()), Duration::from_millis(50));
        local.register_node("down:1").unwrap();
        local.register_node("slow:2").unwrap();
        local.register_node("good:3").unwrap();

        let net = NullPeerNetwork::new();
        net.set_unreachable("down:1", ChainKind::Register);
        net.serve_slowly(
            "slow:2",
            ChainKind::Register,
            Duration::from_secs(5),
            peer_chain(9),
        );
        net.serve("good:3", ChainKind::Register, peer_chain(3));

        assert!(local.resolve_conflicts(&net).await);
        assert_eq!(local.len(), 3);
        assert_eq!(net.fetches().len(), 3);
    }

    #[tokio::test]
    async fn no_peers_means_no_change() {
        let local = ledger("me", Arc::new(NullChainStore::new()), Duration::from_secs(1));
        let net = NullPeerNetwork::new();
        assert!(!local.resolve_conflicts(&net).await);
        assert!(net.fetches().is_empty());
    }

    #[test]
    fn adopt_refuses_when_local_caught_up() {
        let local = ledger("me", Arc::new(NullChainStore::new()), Duration::from_secs(1));
        local.mine();
        local.mine();
        assert!(!local.adopt(peer_chain(3).chain));
        assert_eq!(local.last_block().unwrap().source, NodeId::new("me"));
    }
}
