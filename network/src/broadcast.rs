//! Fire-and-forget resolve notifications.
//!
//! After a node seals a block it tells every known peer to run consensus for
//! that chain. Each notification runs as its own detached task; the caller
//! never waits on a peer and never sees a peer's failure.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::peer::PeerNotifier;
use dcns_types::ChainKind;

/// Outcome of a broadcast attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Number of peers a notification task was spawned for.
    pub spawned: usize,
    /// Number of peers skipped because no runtime was available.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct PeerBroadcaster {
    notifier: Arc<dyn PeerNotifier>,
}

impl PeerBroadcaster {
    pub fn new(notifier: Arc<dyn PeerNotifier>) -> Self {
        Self { notifier }
    }

    /// Spawn one `notify_resolve(peer, kind)` task per peer.
    ///
    /// Outside a tokio runtime nothing is sent.
    pub fn broadcast(&self, kind: ChainKind, peers: &[String]) -> BroadcastResult {
        let mut result = BroadcastResult::default();
        if peers.is_empty() {
            return result;
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!(chain = %kind, peers = peers.len(), "no runtime, skipping resolve broadcast");
                result.skipped = peers.len();
                return result;
            }
        };

        for peer in peers {
            let notifier = Arc::clone(&self.notifier);
            let peer = peer.clone();
            handle.spawn(async move {
                if let Err(e) = notifier.notify_resolve(&peer, kind).await {
                    warn!(peer = %peer, chain = %kind, error = %e, "resolve notification failed");
                }
            });
            result.spawned += 1;
        }

        debug!(chain = %kind, spawned = result.spawned, "resolve broadcast dispatched");
        result
    }
}
