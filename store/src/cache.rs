//! Write-only projection of derived state (token balances, resolved records).
//!
//! Never read back as truth: it is rebuilt from chain replay on every mutation
//! and exists so operators can inspect a node's view without querying it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::StoreError;
use dcns_types::{ChainKind, NodeId, Timestamp};

/// The record a hostname currently resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub ip: String,
    pub port: u16,
    pub node_id: NodeId,
    /// Timestamp of the block that sealed the record.
    pub timestamp: Timestamp,
    pub chain_kind: ChainKind,
    pub lease_years: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub tokens: BTreeMap<NodeId, i64>,
    pub dns_entries: BTreeMap<String, CachedRecord>,
}

pub trait CacheStore: Send + Sync {
    fn save_cache(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError>;
}
