//! Periodic staging flushes, one background task per chain.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::resolver::Resolver;
use crate::shutdown::ShutdownController;
use dcns_types::ChainKind;

/// Spawn a flush loop for each chain. Each loop stops on shutdown.
///
/// The first flush happens one `period` after spawning.
pub fn spawn_flush_timers(
    resolver: &Arc<Resolver>,
    period: Duration,
    shutdown: &ShutdownController,
) -> Vec<JoinHandle<()>> {
    ChainKind::ALL
        .iter()
        .map(|&kind| {
            let resolver = Arc::clone(resolver);
            let mut shutdown_rx = shutdown.subscribe();
            tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => {
                            info!(chain = %kind, "flush timer shutting down");
                            break;
                        }
                        _ = interval.tick() => {
                            match resolver.periodic_flush(kind) {
                                Some(block) => info!(chain = %kind, index = block.index, "timer sealed block"),
                                None => debug!(chain = %kind, "nothing to flush"),
                            }
                        }
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerParams;
    use crate::entry::NewEntry;
    use crate::resolver::ResolverDeps;
    use dcns_nullables::{NullCacheStore, NullChainStore, NullClock, NullPeerNetwork, NullStagingStore};
    use dcns_types::NodeId;

    fn resolver() -> Arc<Resolver> {
        let network = Arc::new(NullPeerNetwork::new());
        Arc::new(Resolver::new(
            NodeId::new("timer-node"),
            LedgerParams::default(),
            ResolverDeps {
                chains: Arc::new(NullChainStore::new()),
                staging: Arc::new(NullStagingStore::new()),
                cache: Arc::new(NullCacheStore::new()),
                fetcher: network.clone(),
                notifier: network,
                clock: Arc::new(NullClock::new(7)),
            },
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn timer_seals_staged_entries() {
        let resolver = resolver();
        let shutdown = ShutdownController::new();
        resolver
            .new_entry(NewEntry::dns("tick.dc", "10.0.0.1", 80))
            .unwrap();

        let handles = spawn_flush_timers(&resolver, Duration::from_secs(60), &shutdown);
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(resolver.staging(ChainKind::Dns).is_empty());
        assert_eq!(resolver.ledger(ChainKind::Dns).len(), 2);
        assert!(resolver.lookup("tick.dc").unwrap().on_chain);

        shutdown.shutdown();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timers_stop_on_shutdown() {
        let resolver = resolver();
        let shutdown = ShutdownController::new();
        let handles = spawn_flush_timers(&resolver, Duration::from_secs(60), &shutdown);
        shutdown.shutdown();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("timer should stop")
                .unwrap();
        }
        assert_eq!(resolver.ledger(ChainKind::Register).len(), 1);
    }
}
