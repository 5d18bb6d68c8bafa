//! Domain status, lookup results and lease bookkeeping.

use serde::{Deserialize, Serialize};

use dcns_types::{Block, ChainKind, DnsRecord, NodeId, Timestamp, Transaction};

/// Where a hostname stands right now.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStatus {
    pub exists: bool,
    pub expired: bool,
    pub chain_kind: Option<ChainKind>,
    /// `false` while the entry is staged or buffered but not yet in a block.
    pub on_chain: bool,
}

impl DomainStatus {
    pub fn unregistered() -> Self {
        Self::default()
    }

    pub(crate) fn buffered(kind: ChainKind) -> Self {
        Self {
            exists: true,
            expired: false,
            chain_kind: Some(kind),
            on_chain: false,
        }
    }

    pub(crate) fn confirmed(kind: ChainKind, expired: bool) -> Self {
        Self {
            exists: true,
            expired,
            chain_kind: Some(kind),
            on_chain: true,
        }
    }

    /// Whether a new registration for the hostname must be refused.
    pub fn blocks_registration(&self) -> bool {
        self.exists && !self.expired
    }
}

/// Address a hostname resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub ip: String,
    pub port: u16,
    pub on_chain: bool,
}

impl Resolution {
    pub(crate) fn from_record(record: &DnsRecord, on_chain: bool) -> Self {
        Self {
            ip: record.ip.clone(),
            port: record.port,
            on_chain,
        }
    }
}

/// A register-chain lease held by some identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLease {
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub lease_years: u32,
    pub block_index: u64,
    pub registered_at: Timestamp,
    pub expires_at: Timestamp,
    pub expired: bool,
}

/// The most recent record for `hostname` sealed in `chain`, with its block.
pub fn latest_record<'a>(chain: &'a [Block], hostname: &str) -> Option<(&'a Block, &'a DnsRecord)> {
    chain.iter().rev().find_map(|block| {
        block
            .transactions
            .iter()
            .rev()
            .filter_map(Transaction::as_dns_record)
            .find(|record| record.hostname == hostname)
            .map(|record| (block, record))
    })
}

/// The most recent record for `hostname` among unsealed transactions.
pub fn latest_buffered<'a>(txs: &'a [Transaction], hostname: &str) -> Option<&'a DnsRecord> {
    txs.iter()
        .rev()
        .filter_map(Transaction::as_dns_record)
        .find(|record| record.hostname == hostname)
}

/// Lease rule: expired once `now` is strictly past the sealing block's
/// timestamp plus the leased number of years.
pub fn lease_expired(sealed_at: Timestamp, lease_secs: u64, now: Timestamp) -> bool {
    sealed_at.has_expired(lease_secs, now)
}

/// Latest register-chain record of every hostname currently owned by `owner`.
pub(crate) fn leases_of(
    chain: &[Block],
    owner: &NodeId,
    lease_secs: impl Fn(u32) -> u64,
    now: Timestamp,
) -> Vec<DomainLease> {
    let mut latest: std::collections::BTreeMap<&str, (&Block, &DnsRecord)> =
        std::collections::BTreeMap::new();
    for block in chain {
        for record in block.dns_records() {
            latest.insert(record.hostname.as_str(), (block, record));
        }
    }

    latest
        .into_values()
        .filter(|(_, record)| &record.node_id == owner)
        .map(|(block, record)| {
            let secs = lease_secs(record.lease_years);
            DomainLease {
                hostname: record.hostname.clone(),
                ip: record.ip.clone(),
                port: record.port,
                lease_years: record.lease_years,
                block_index: block.index,
                registered_at: block.timestamp,
                expires_at: Timestamp::new(block.timestamp.as_secs().saturating_add(secs)),
                expired: lease_expired(block.timestamp, secs, now),
            }
        })
        .collect()
}
