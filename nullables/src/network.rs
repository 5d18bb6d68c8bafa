//! Nullable peer network: scripted chain dumps and recorded notifications.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use dcns_network::{ChainFetcher, NetworkError, PeerNotifier};
use dcns_types::{ChainDump, ChainKind};

#[derive(Clone, Debug)]
enum PeerBehaviour {
    Serve(ChainDump),
    Unreachable,
    /// Sleep before answering; used to exercise per-peer timeouts.
    Slow(Duration, ChainDump),
}

/// A peer network that answers from a script instead of sockets.
///
/// Peers with no script are unreachable.
#[derive(Debug, Default)]
pub struct NullPeerNetwork {
    script: Mutex<HashMap<(String, ChainKind), PeerBehaviour>>,
    fetches: Mutex<Vec<(String, ChainKind)>>,
    notifications: Mutex<Vec<(String, ChainKind)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NullPeerNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// `peer` serves `dump` for `kind`.
    pub fn serve(&self, peer: &str, kind: ChainKind, dump: ChainDump) {
        lock(&self.script).insert((peer.to_string(), kind), PeerBehaviour::Serve(dump));
    }

    /// `peer` serves `dump` for `kind`, but only after `delay`.
    pub fn serve_slowly(&self, peer: &str, kind: ChainKind, delay: Duration, dump: ChainDump) {
        lock(&self.script).insert((peer.to_string(), kind), PeerBehaviour::Slow(delay, dump));
    }

    pub fn set_unreachable(&self, peer: &str, kind: ChainKind) {
        lock(&self.script).insert((peer.to_string(), kind), PeerBehaviour::Unreachable);
    }

    /// Every chain fetch attempted so far.
    pub fn fetches(&self) -> Vec<(String, ChainKind)> {
        lock(&self.fetches).clone()
    }

    /// Every resolve notification "sent" so far.
    pub fn notifications(&self) -> Vec<(String, ChainKind)> {
        lock(&self.notifications).clone()
    }

    /// Clear all state.
    pub fn reset(&self) {
        lock(&self.script).clear();
        lock(&self.fetches).clear();
        lock(&self.notifications).clear();
    }
}

#[async_trait]
impl ChainFetcher for NullPeerNetwork {
    async fn fetch_chain(&self, peer: &str, kind: ChainKind) -> Result<ChainDump, NetworkError> {
        lock(&self.fetches).push((peer.to_string(), kind));
        let behaviour = lock(&self.script).get(&(peer.to_string(), kind)).cloned();
        match behaviour {
            Some(PeerBehaviour::Serve(dump)) => Ok(dump),
            Some(PeerBehaviour::Slow(delay, dump)) => {
                tokio::time::sleep(delay).await;
                Ok(dump)
            }
            Some(PeerBehaviour::Unreachable) | None => {
                Err(NetworkError::Unreachable(peer.to_string()))
            }
        }
    }
}

#[async_trait]
impl PeerNotifier for NullPeerNetwork {
    async fn notify_resolve(&self, peer: &str, kind: ChainKind) -> Result<(), NetworkError> {
        lock(&self.notifications).push((peer.to_string(), kind));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_and_unscripted_peers() {
        let net = NullPeerNetwork::new();
        net.serve("a:1", ChainKind::Dns, ChainDump::new(Vec::new()));

        assert!(net.fetch_chain("a:1", ChainKind::Dns).await.is_ok());
        assert!(net.fetch_chain("a:1", ChainKind::Register).await.is_err());
        assert!(net.fetch_chain("b:2", ChainKind::Dns).await.is_err());
        assert_eq!(net.fetches().len(), 3);

        net.notify_resolve("a:1", ChainKind::Register).await.unwrap();
        assert_eq!(net.notifications(), vec![("a:1".to_string(), ChainKind::Register)]);
    }
}
