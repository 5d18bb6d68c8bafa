//! Peer-facing seams used by the ledgers and the broadcaster.

use async_trait::async_trait;

use crate::NetworkError;
use dcns_types::{ChainDump, ChainKind};

/// Fetches a peer's full chain for one chain kind.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str, kind: ChainKind) -> Result<ChainDump, NetworkError>;
}

/// Asks a peer to run consensus for one chain kind.
#[async_trait]
pub trait PeerNotifier: Send + Sync {
    async fn notify_resolve(&self, peer: &str, kind: ChainKind) -> Result<(), NetworkError>;
}

/// Reduce a peer address to its `host:port` authority.
///
/// Accepts `http://host:port/...`, `https://host:port` or a bare `host:port`.
/// Returns `None` when nothing usable remains.
pub fn peer_authority(address: &str) -> Option<String> {
    let trimmed = address.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    let authority = without_scheme.split('/').next().unwrap_or_default();
    if authority.is_empty() || authority.chars().any(char::is_whitespace) {
        None
    } else {
        Some(authority.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_strips_scheme_and_path() {
        assert_eq!(
            peer_authority("http://192.168.0.5:5000").as_deref(),
            Some("192.168.0.5:5000")
        );
        assert_eq!(
            peer_authority("https://node.example:443/nodes/chain").as_deref(),
            Some("node.example:443")
        );
        assert_eq!(peer_authority(" 10.0.0.1:5000 ").as_deref(), Some("10.0.0.1:5000"));
    }

    #[test]
    fn authority_rejects_empty() {
        assert_eq!(peer_authority(""), None);
        assert_eq!(peer_authority("http://"), None);
        assert_eq!(peer_authority("http:///path"), None);
    }
}
