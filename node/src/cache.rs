//! Hostname → record cache, rebuilt from both chains after every mutation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use dcns_store::CachedRecord;
use dcns_types::{Block, ChainKind};

#[derive(Debug, Default)]
pub struct DnsCache {
    entries: RwLock<HashMap<String, CachedRecord>>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache with the latest record of every hostname.
    ///
    /// Register records are applied first so a DNS-chain record for the same
    /// hostname wins.
    pub fn rebuild(&self, register_chain: &[Block], dns_chain: &[Block]) {
        let mut entries = HashMap::new();
        for (kind, chain) in [(ChainKind::Register, register_chain), (ChainKind::Dns, dns_chain)] {
            for block in chain {
                for record in block.dns_records() {
                    entries.insert(
                        record.hostname.clone(),
                        CachedRecord {
                            ip: record.ip.clone(),
                            port: record.port,
                            node_id: record.node_id.clone(),
                            timestamp: block.timestamp,
                            chain_kind: kind,
                            lease_years: record.lease_years,
                        },
                    );
                }
            }
        }
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
    }

    pub fn get(&self, hostname: &str) -> Option<CachedRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hostname)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy for persistence.
    pub fn snapshot(&self) -> BTreeMap<String, CachedRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(host, record)| (host.clone(), record.clone()))
            .collect()
    }
}
